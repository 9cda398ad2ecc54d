//! Engine handle lifecycle for a single tab: materialize, evict, close, and
//! the engine callbacks that move a tab between those states.

use super::{AttachedHandle, EngineSlot, PendingLoad, TabEntity, TabError, TabId};
use crate::engine::{EngineError, EngineEventKind, HistoryEntry, WebEngine};
use crate::session::{QueryMetadata, SessionSnapshot, codec};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tabkeep_scripting::{
    ContentScript, ContentScriptRouter, RouterError, ScriptCatalog, ScriptEffect, ScriptName,
};

/// Result of a successful `materialize` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeOutcome {
    /// The tab already had a committed handle
    AlreadyLive,
    /// A load for this generation is already in flight
    InFlight { generation: u64 },
    /// A new handle was created and its load started
    Started { generation: u64, restoring: bool },
}

/// Result of a successful `evict` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictOutcome {
    /// Handle released, snapshot kept for restore
    Evicted,
    /// Handle released with nothing to capture; the tab reloads its URL
    EvictedCold,
    /// There was no handle to release
    AlreadyEvicted,
}

/// Observable change caused by an engine event
#[derive(Debug, Clone, PartialEq)]
pub enum TabChange {
    /// The pending load or restore committed; the handle is now live
    Materialized,
    /// The pending load failed and the handle was released
    MaterializeFailed(String),
    Navigated,
    MetadataChanged,
    PromptQueued,
    FindResultsChanged,
    /// A message for an embedder-defined script
    CustomScript {
        name: String,
        payload: Map<String, Value>,
    },
}

/// What a back press should do
#[derive(Debug, Clone, PartialEq)]
pub enum BackNavigation {
    /// The current page came from a search; reopen the search UI with this query
    ResumeSearch(QueryMetadata),
    /// A literal back step was issued to the engine
    Stepped,
}

/// State handed back when a tab is closed
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTab {
    pub id: TabId,
    pub root_id: TabId,
    pub parent_id: Option<TabId>,
    pub url: String,
    pub title: String,
    pub favicon: Option<String>,
    pub is_incognito: bool,
    pub last_active_at: DateTime<Utc>,
    pub cancelled_prompts: usize,
}

impl TabEntity {
    /// Make sure this tab has an engine handle.
    ///
    /// The new handle gets a fresh router carrying the built-in scripts and
    /// everything in `scripts`. With a stored snapshot the new handle is asked to restore it; the
    /// snapshot stays with the tab until the engine confirms the restore.
    /// Without one the tab's URL is loaded directly. Either way the handle
    /// counts as live only once the completion event arrives.
    ///
    /// On failure the tab is left exactly as it was, so the next call retries.
    pub fn materialize(
        &mut self,
        engine: &dyn WebEngine,
        scripts: &ScriptCatalog,
    ) -> Result<MaterializeOutcome, EngineError> {
        let snapshot = match &mut self.slot {
            EngineSlot::Live(_) => return Ok(MaterializeOutcome::AlreadyLive),
            EngineSlot::Pending { .. } => {
                return Ok(MaterializeOutcome::InFlight {
                    generation: self.generation,
                });
            }
            EngineSlot::Zombie(snapshot) => snapshot.take(),
        };

        let generation = self.generation + 1;
        let handle = match engine.create_handle(self.id(), generation, self.is_incognito()) {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("Tab {}: engine handle creation failed: {}", self.id(), e);
                self.slot = EngineSlot::Zombie(snapshot);
                return Err(e);
            }
        };
        self.generation = generation;

        let mut router = ContentScriptRouter::new();
        if let Err(e) = scripts.install(&mut router) {
            log::error!("Tab {}: content script registration failed: {}", self.id(), e);
        }
        let mut attached = AttachedHandle { handle, router };

        let restoring = snapshot.is_some();
        let started = match snapshot {
            Some(snapshot) => {
                let request = codec::decode(&snapshot);
                match attached.handle.restore(&request) {
                    Ok(()) => Ok(PendingLoad::Restore {
                        queries: request.queries,
                        snapshot,
                    }),
                    Err(e) => Err((e, Some(snapshot))),
                }
            }
            None => match attached.handle.load(self.url()) {
                Ok(()) => Ok(PendingLoad::Url),
                Err(e) => Err((e, None)),
            },
        };

        match started {
            Ok(load) => {
                log::debug!(
                    "Tab {}: materializing (generation {}, restoring {})",
                    self.id(),
                    generation,
                    restoring
                );
                self.slot = EngineSlot::Pending { attached, load };
                Ok(MaterializeOutcome::Started {
                    generation,
                    restoring,
                })
            }
            Err((e, snapshot)) => {
                log::warn!("Tab {}: initial load rejected: {}", self.id(), e);
                attached.release();
                self.generation += 1;
                self.slot = EngineSlot::Zombie(snapshot);
                Err(e)
            }
        }
    }

    /// Capture the back/forward list without changing anything.
    ///
    /// Returns `None` when there is nothing restorable (no handle and no
    /// stored snapshot, or a handle that has not committed any entry yet).
    pub fn capture_session_state(&self) -> Option<SessionSnapshot> {
        match &self.slot {
            EngineSlot::Zombie(snapshot) => snapshot.clone(),
            EngineSlot::Pending {
                load: PendingLoad::Restore { snapshot, .. },
                ..
            } => Some(snapshot.clone()),
            EngineSlot::Live(attached)
            | EngineSlot::Pending {
                attached,
                load: PendingLoad::Url,
            } => {
                let history = attached.handle.history();
                if history.is_empty() {
                    return None;
                }
                match codec::encode(
                    &history.entries,
                    history.current_index as isize,
                    &self.queries,
                ) {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => {
                        log::warn!("Tab {}: session capture failed: {}", self.id(), e);
                        None
                    }
                }
            }
        }
    }

    /// Release the engine handle, keeping a snapshot when one can be taken.
    ///
    /// The snapshot is fully captured before the handle is dropped. Prompts
    /// raised by the released page are cancelled and a query waiting for a
    /// commit is discarded.
    pub fn evict(&mut self) -> Result<EvictOutcome, TabError> {
        if self.is_foreground() {
            return Err(TabError::Foreground(self.id()));
        }

        let snapshot = match &self.slot {
            EngineSlot::Zombie(_) => return Ok(EvictOutcome::AlreadyEvicted),
            _ => self.capture_session_state(),
        };

        if let EngineSlot::Live(attached) | EngineSlot::Pending { attached, .. } =
            std::mem::replace(&mut self.slot, EngineSlot::Zombie(None))
        {
            attached.release();
        }

        if let Some(snapshot) = &snapshot {
            self.set_url(snapshot.current_url.clone());
        }
        let outcome = if snapshot.is_some() {
            EvictOutcome::Evicted
        } else {
            EvictOutcome::EvictedCold
        };
        self.slot = EngineSlot::Zombie(snapshot);
        self.generation += 1;
        self.queries.clear();
        self.pending_query = None;
        self.find_results = None;
        let cancelled = self.prompts.cancel_all();

        log::debug!(
            "Tab {}: evicted ({:?}, {} prompt(s) cancelled)",
            self.id(),
            outcome,
            cancelled
        );
        Ok(outcome)
    }

    /// Tear the tab down for good.
    ///
    /// Queued prompts are cancelled and scripts unregistered before the
    /// handle is dropped. No snapshot is taken.
    pub fn close(mut self) -> ClosedTab {
        let cancelled_prompts = self.prompts.cancel_all();
        if let EngineSlot::Live(attached) | EngineSlot::Pending { attached, .. } =
            std::mem::replace(&mut self.slot, EngineSlot::Zombie(None))
        {
            attached.release();
        }
        log::debug!("Tab {}: closed", self.id());

        ClosedTab {
            id: self.id(),
            root_id: self.root_id(),
            parent_id: self.parent_id(),
            url: self.url().to_string(),
            title: self.title().to_string(),
            favicon: self.favicon().map(str::to_string),
            is_incognito: self.is_incognito(),
            last_active_at: self.last_active_at(),
            cancelled_prompts,
        }
    }

    /// Start a navigation in the live handle.
    pub fn navigate(&mut self, url: &str) -> Result<(), TabError> {
        match &mut self.slot {
            EngineSlot::Live(attached) => Ok(attached.handle.load(url)?),
            _ => Err(TabError::NotLive(self.id())),
        }
    }

    /// Handle a back press.
    ///
    /// When the current entry was produced by a search, the caller gets the
    /// query back instead of a literal back step. A literal step discards any
    /// query still waiting for a commit.
    pub fn go_back(&mut self) -> Result<BackNavigation, TabError> {
        let EngineSlot::Live(attached) = &mut self.slot else {
            return Err(TabError::NotLive(self.id));
        };
        let history = attached.handle.history();
        if let Some(query) = history.current().and_then(|e| self.queries.find(e.id)) {
            return Ok(BackNavigation::ResumeSearch(query.clone()));
        }
        if let Some(query) = self.pending_query.take() {
            log::debug!("Tab {}: dropping pending query '{}' on back", self.id, query.typed);
        }
        attached.handle.go_back()?;
        Ok(BackNavigation::Stepped)
    }

    /// Add an embedder script to the router of the current handle.
    ///
    /// Returns false when the tab has no handle; it picks the script up on
    /// its next materialize instead.
    pub(crate) fn register_script(
        &mut self,
        name: ScriptName,
        handler: Box<dyn ContentScript>,
    ) -> Result<bool, RouterError> {
        match &mut self.slot {
            EngineSlot::Live(attached) | EngineSlot::Pending { attached, .. } => {
                attached.router.register(name, handler)?;
                Ok(true)
            }
            EngineSlot::Zombie(_) => Ok(false),
        }
    }

    /// Associate `query` with the entry that is current right now.
    pub fn attach_query(&mut self, query: QueryMetadata) -> Result<(), TabError> {
        let EngineSlot::Live(attached) = &self.slot else {
            return Err(TabError::NotLive(self.id));
        };
        let current = attached
            .handle
            .history()
            .current()
            .map(|e| e.id)
            .ok_or(TabError::NotLive(self.id))?;
        self.queries.attach(query, current);
        Ok(())
    }

    /// Apply an engine callback for this tab's current generation.
    pub(crate) fn handle_event(&mut self, kind: EngineEventKind) -> Option<TabChange> {
        match kind {
            EngineEventKind::NavigationCommitted { entry } => Some(self.commit_navigation(entry)),
            EngineEventKind::RestoreCommitted => self.complete_restore(),
            EngineEventKind::LoadFailed { error } => self.fail_pending(error),
            EngineEventKind::TitleChanged { title } => {
                self.set_title(title);
                Some(TabChange::MetadataChanged)
            }
            EngineEventKind::HistoryPruned { removed } => {
                self.queries.prune(&removed);
                None
            }
            EngineEventKind::ScriptMessage { body } => {
                let effect = match &mut self.slot {
                    EngineSlot::Live(attached) | EngineSlot::Pending { attached, .. } => {
                        attached.router.dispatch_raw(&body).into_effect()
                    }
                    EngineSlot::Zombie(_) => None,
                };
                effect.and_then(|effect| self.apply_script_effect(effect))
            }
        }
    }

    fn commit_navigation(&mut self, entry: HistoryEntry) -> TabChange {
        if let Some(query) = self.pending_query.take() {
            self.queries.attach(query, entry.id);
        }
        self.set_url(entry.url);
        if !entry.title.is_empty() {
            self.set_title(entry.title);
        }

        if matches!(
            self.slot,
            EngineSlot::Pending {
                load: PendingLoad::Url,
                ..
            }
        ) {
            self.promote();
            TabChange::Materialized
        } else {
            TabChange::Navigated
        }
    }

    /// Finish a pending restore: reattach queries by position and drop the snapshot
    fn complete_restore(&mut self) -> Option<TabChange> {
        let EngineSlot::Pending {
            attached,
            load: PendingLoad::Restore { queries, .. },
        } = &self.slot
        else {
            return None;
        };

        let history = attached.handle.history();
        for (entry, query) in history.entries.iter().zip(queries.iter()) {
            if let Some(query) = query {
                self.queries.attach(query.clone(), entry.id);
            }
        }
        if let Some(current) = history.current() {
            self.url = current.url.clone();
            if !current.title.is_empty() {
                self.title = current.title.clone();
            }
        }

        self.promote();
        log::debug!("Tab {}: restore committed", self.id());
        Some(TabChange::Materialized)
    }

    fn promote(&mut self) {
        if let EngineSlot::Pending { attached, .. } =
            std::mem::replace(&mut self.slot, EngineSlot::Zombie(None))
        {
            self.slot = EngineSlot::Live(attached);
        }
    }

    fn fail_pending(&mut self, error: String) -> Option<TabChange> {
        // The query belonged to the navigation that just failed
        self.pending_query = None;
        if !matches!(self.slot, EngineSlot::Pending { .. }) {
            log::warn!("Tab {}: load failed: {}", self.id(), error);
            return None;
        }

        let snapshot = match std::mem::replace(&mut self.slot, EngineSlot::Zombie(None)) {
            EngineSlot::Pending { attached, load } => {
                attached.release();
                match load {
                    PendingLoad::Restore { snapshot, .. } => Some(snapshot),
                    PendingLoad::Url => None,
                }
            }
            _ => None,
        };
        self.slot = EngineSlot::Zombie(snapshot);
        self.generation += 1;
        log::warn!("Tab {}: materialize failed: {}", self.id(), error);
        Some(TabChange::MaterializeFailed(error))
    }

    fn apply_script_effect(&mut self, effect: ScriptEffect) -> Option<TabChange> {
        match effect {
            ScriptEffect::MetadataChanged { title, favicon } => {
                if let Some(title) = title {
                    self.set_title(title);
                }
                if favicon.is_some() {
                    self.set_favicon(favicon);
                }
                Some(TabChange::MetadataChanged)
            }
            ScriptEffect::SessionRestored => self.complete_restore(),
            ScriptEffect::PromptRequested(request) => {
                self.prompts.enqueue(request, None);
                Some(TabChange::PromptQueued)
            }
            ScriptEffect::FindResults { current, total } => {
                self.set_find_results(current, total);
                Some(TabChange::FindResultsChanged)
            }
            ScriptEffect::Custom { name, payload } => {
                Some(TabChange::CustomScript { name, payload })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineEvent, HeadlessEngine};
    use crate::tab::HandleState;
    use std::sync::mpsc::Receiver;

    fn pump(tab: &mut TabEntity, rx: &Receiver<EngineEvent>) -> Vec<TabChange> {
        let mut changes = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if event.generation != tab.generation() {
                continue;
            }
            changes.extend(tab.handle_event(event.kind));
        }
        changes
    }

    fn live_tab(engine: &HeadlessEngine, rx: &Receiver<EngineEvent>, url: &str) -> TabEntity {
        let mut tab = TabEntity::new(url, None, false, Utc::now());
        tab.materialize(engine, &ScriptCatalog::new()).unwrap();
        assert_eq!(tab.handle_state(), HandleState::Materializing);
        pump(&mut tab, rx);
        assert!(tab.is_live());
        tab
    }

    #[test]
    fn test_materialize_is_idempotent() {
        let (engine, rx) = HeadlessEngine::new(50);
        let mut tab = TabEntity::new("https://example.com", None, false, Utc::now());
        assert!(matches!(
            tab.materialize(&engine, &ScriptCatalog::new()).unwrap(),
            MaterializeOutcome::Started { restoring: false, .. }
        ));
        assert!(matches!(
            tab.materialize(&engine, &ScriptCatalog::new()).unwrap(),
            MaterializeOutcome::InFlight { .. }
        ));
        pump(&mut tab, &rx);
        assert_eq!(
            tab.materialize(&engine, &ScriptCatalog::new()).unwrap(),
            MaterializeOutcome::AlreadyLive
        );
        assert_eq!(engine.created_handles(), 1);
    }

    #[test]
    fn test_create_failure_leaves_tab_retryable() {
        let (engine, rx) = HeadlessEngine::new(50);
        engine.fail_next_creates(1);
        let mut tab = TabEntity::new("https://example.com", None, false, Utc::now());
        assert!(tab.materialize(&engine, &ScriptCatalog::new()).is_err());
        assert_eq!(tab.handle_state(), HandleState::Cold);

        tab.materialize(&engine, &ScriptCatalog::new()).unwrap();
        pump(&mut tab, &rx);
        assert!(tab.is_live());
    }

    #[test]
    fn test_evict_then_restore_keeps_history() {
        let (engine, rx) = HeadlessEngine::new(50);
        let mut tab = live_tab(&engine, &rx, "https://example.com");
        tab.navigate("/page2").unwrap();
        tab.navigate("/page3").unwrap();
        pump(&mut tab, &rx);

        assert_eq!(tab.evict().unwrap(), EvictOutcome::Evicted);
        assert!(!tab.has_engine_handle());
        assert!(tab.session_state().is_some());
        assert_eq!(engine.live_handles(), 0);

        assert!(matches!(
            tab.materialize(&engine, &ScriptCatalog::new()).unwrap(),
            MaterializeOutcome::Started { restoring: true, .. }
        ));
        // The snapshot is held until the restore commits
        assert!(tab.capture_session_state().is_some());
        assert_eq!(pump(&mut tab, &rx), vec![TabChange::Materialized]);
        assert!(tab.session_state().is_none());
        assert_eq!(tab.url(), "https://example.com/page3");
    }

    #[test]
    fn test_evict_foreground_is_rejected() {
        let (engine, rx) = HeadlessEngine::new(50);
        let mut tab = live_tab(&engine, &rx, "https://example.com");
        tab.set_foreground(true);
        assert!(matches!(tab.evict(), Err(TabError::Foreground(_))));
        assert!(tab.is_live());
    }

    #[test]
    fn test_evict_before_first_commit_is_cold() {
        let (engine, _rx) = HeadlessEngine::new(50);
        let mut tab = TabEntity::new("/relative", None, false, Utc::now());
        tab.materialize(&engine, &ScriptCatalog::new()).unwrap();
        assert_eq!(tab.evict().unwrap(), EvictOutcome::EvictedCold);
        assert_eq!(tab.handle_state(), HandleState::Cold);
        assert_eq!(tab.url(), "/relative");
        assert_eq!(tab.evict().unwrap(), EvictOutcome::AlreadyEvicted);
    }

    #[test]
    fn test_load_failure_returns_to_zombie() {
        let (engine, rx) = HeadlessEngine::new(50);
        let mut tab = TabEntity::new("/nowhere", None, false, Utc::now());
        tab.materialize(&engine, &ScriptCatalog::new()).unwrap();
        let changes = pump(&mut tab, &rx);
        assert!(matches!(changes.as_slice(), [TabChange::MaterializeFailed(_)]));
        assert_eq!(tab.handle_state(), HandleState::Cold);
        assert_eq!(engine.live_handles(), 0);
    }

    #[test]
    fn test_back_resumes_search_for_query_entries() {
        let (engine, rx) = HeadlessEngine::new(50);
        let mut tab = live_tab(&engine, &rx, "https://example.com");
        tab.set_pending_query(QueryMetadata::typed("rust"));
        tab.navigate("https://search.test/?q=rust").unwrap();
        pump(&mut tab, &rx);

        assert_eq!(
            tab.go_back().unwrap(),
            BackNavigation::ResumeSearch(QueryMetadata::typed("rust"))
        );

        tab.navigate("https://example.com/next").unwrap();
        pump(&mut tab, &rx);
        assert_eq!(tab.go_back().unwrap(), BackNavigation::Stepped);
        pump(&mut tab, &rx);
        assert_eq!(tab.url(), "https://search.test/?q=rust");
    }

    #[test]
    fn test_script_messages_update_tab() {
        let (engine, rx) = HeadlessEngine::new(50);
        let mut tab = live_tab(&engine, &rx, "https://example.com");

        let change = tab.handle_event(EngineEventKind::ScriptMessage {
            body: r#"{"name":"metadataMessageHandler","title":"Hello","icon":"https://example.com/fav.ico"}"#
                .to_string(),
        });
        assert_eq!(change, Some(TabChange::MetadataChanged));
        assert_eq!(tab.title(), "Hello");
        assert_eq!(tab.favicon(), Some("https://example.com/fav.ico"));

        let change = tab.handle_event(EngineEventKind::ScriptMessage {
            body: r#"{"name":"promptHandler","kind":"confirm","message":"Leave?"}"#.to_string(),
        });
        assert_eq!(change, Some(TabChange::PromptQueued));
        assert_eq!(tab.prompts().len(), 1);

        let change = tab.handle_event(EngineEventKind::ScriptMessage {
            body: r#"{"name":"noSuchHandler"}"#.to_string(),
        });
        assert_eq!(change, None);
    }

    #[test]
    fn test_close_cancels_prompts_and_releases_handle() {
        let (engine, rx) = HeadlessEngine::new(50);
        let mut tab = live_tab(&engine, &rx, "https://example.com");
        tab.handle_event(EngineEventKind::ScriptMessage {
            body: r#"{"name":"promptHandler","kind":"alert","message":"hi"}"#.to_string(),
        });

        let closed = tab.close();
        assert_eq!(closed.cancelled_prompts, 1);
        assert_eq!(closed.url, "https://example.com/");
        assert_eq!(engine.live_handles(), 0);
    }

    #[test]
    fn test_failed_navigation_discards_pending_query() {
        let (engine, rx) = HeadlessEngine::new(50);
        let mut tab = live_tab(&engine, &rx, "https://example.com");
        tab.set_pending_query(QueryMetadata::typed("rust"));
        tab.navigate("http://[broken").unwrap();
        pump(&mut tab, &rx);
        assert!(tab.is_live());

        tab.navigate("https://plain.test/").unwrap();
        pump(&mut tab, &rx);
        assert!(tab.queries().is_empty());
        assert_eq!(tab.go_back().unwrap(), BackNavigation::Stepped);
    }

    #[test]
    fn test_back_step_discards_pending_query() {
        let (engine, rx) = HeadlessEngine::new(50);
        let mut tab = live_tab(&engine, &rx, "https://example.com");
        tab.navigate("/second").unwrap();
        pump(&mut tab, &rx);

        tab.set_pending_query(QueryMetadata::typed("rust"));
        assert_eq!(tab.go_back().unwrap(), BackNavigation::Stepped);
        pump(&mut tab, &rx);
        assert_eq!(tab.url(), "https://example.com/");
        assert!(tab.queries().is_empty());
    }

    #[test]
    fn test_evict_discards_pending_query_and_prompts() {
        let (engine, rx) = HeadlessEngine::new(50);
        let mut tab = live_tab(&engine, &rx, "https://example.com");
        tab.set_pending_query(QueryMetadata::typed("rust"));
        tab.handle_event(EngineEventKind::ScriptMessage {
            body: r#"{"name":"promptHandler","kind":"alert","message":"hi"}"#.to_string(),
        });
        assert_eq!(tab.prompts().len(), 1);

        tab.evict().unwrap();
        assert!(tab.prompts().is_empty());

        tab.materialize(&engine, &ScriptCatalog::new()).unwrap();
        pump(&mut tab, &rx);
        tab.navigate("https://plain.test/").unwrap();
        pump(&mut tab, &rx);
        assert!(tab.queries().is_empty());
        assert_eq!(tab.go_back().unwrap(), BackNavigation::Stepped);
    }
}
