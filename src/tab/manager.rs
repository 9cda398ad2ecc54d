//! Tab registry: owns every tab and coordinates selection, eviction,
//! archival, and persistence across the collection.
//!
//! All mutation happens on the owner thread. Engine callbacks are queued on
//! a channel and applied through [`TabRegistry::drain_events`].

use super::notify::Observers;
use super::{
    BackNavigation, ClosedTab, EvictOutcome, MaterializeOutcome, PromptResponse, RegistryEvent,
    TabChange, TabEntity, TabError, TabId,
};
use crate::artifacts::ArtifactStore;
use crate::engine::{EngineError, EngineEvent, WebEngine};
use crate::session::capture::capture_session;
use crate::session::restore::restore_tab;
use crate::session::storage::{load_session_from, save_session_to};
use crate::session::{FlushReport, PersistedSession, QueryMetadata, SessionWriter};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use tabkeep_config::Config;
use tabkeep_scripting::{RouterError, ScriptCatalog, ScriptFactory, ScriptName};

/// Errors from registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no tab with id {0}")]
    UnknownTab(TabId),
    #[error(transparent)]
    Tab(#[from] TabError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Script(#[from] RouterError),
}

/// What `restore_all` brought back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub restored: usize,
    /// Records that could not be read or duplicated an existing tab
    pub skipped: usize,
    /// Tabs whose snapshot was dropped; they reload their bare URL
    pub degraded: usize,
    /// Restored tabs that went straight to the archived partition
    pub archived: usize,
}

/// Owns the live and archived tab partitions
pub struct TabRegistry {
    pub(super) engine: Box<dyn WebEngine>,
    pub(super) config: Config,
    /// Live partition in display order (tabs here may still be zombies)
    pub(super) tabs: Vec<TabEntity>,
    /// Archived partition, most recently archived last
    pub(super) archived: Vec<TabEntity>,
    pub(super) foreground: Option<TabId>,
    pub(super) observers: Observers,
    /// Embedder scripts installed on every new handle
    scripts: ScriptCatalog,
    recently_closed: VecDeque<ClosedTab>,
    artifacts: Option<Box<dyn ArtifactStore>>,
    writer: Option<SessionWriter>,
    session_path: PathBuf,
}

impl TabRegistry {
    /// Create an empty registry
    pub fn new(engine: Box<dyn WebEngine>, config: Config) -> Self {
        let session_path = config.session_file_path();
        Self {
            engine,
            config,
            tabs: Vec::new(),
            archived: Vec::new(),
            foreground: None,
            observers: Observers::default(),
            scripts: ScriptCatalog::new(),
            recently_closed: VecDeque::new(),
            artifacts: None,
            writer: None,
            session_path,
        }
    }

    /// Offload `persist_all` writes to a background writer
    pub fn with_writer(mut self, writer: SessionWriter) -> Self {
        self.session_path = writer.path().to_path_buf();
        self.writer = Some(writer);
        self
    }

    pub fn with_artifacts(mut self, store: Box<dyn ArtifactStore>) -> Self {
        self.artifacts = Some(store);
        self
    }

    /// Persist to `path` instead of the configured session file
    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = path.into();
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &dyn WebEngine {
        self.engine.as_ref()
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    /// Register an embedder content script for every tab.
    ///
    /// Tabs that already hold a handle get an instance right away, and each
    /// later materialize builds a fresh one from `factory`. A name that is
    /// already taken, built-ins included, is rejected and the existing
    /// handler stays active.
    pub fn register_script(
        &mut self,
        name: impl Into<ScriptName>,
        factory: ScriptFactory,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        self.scripts.register(name.clone(), factory)?;

        let mut attached = 0;
        for tab in self.tabs.iter_mut().chain(self.archived.iter_mut()) {
            if !tab.has_engine_handle() {
                continue;
            }
            let Some(handler) = self.scripts.instantiate(&name) else {
                break;
            };
            match tab.register_script(name.clone(), handler) {
                Ok(true) => attached += 1,
                Ok(false) => {}
                Err(e) => log::warn!("Tab {}: {}", tab.id(), e),
            }
        }
        log::info!("Registered content script '{}' ({} live tab(s))", name, attached);
        Ok(())
    }

    pub fn scripts(&self) -> &ScriptCatalog {
        &self.scripts
    }

    /// Receive a [`RegistryEvent`] after every committed transition
    pub fn subscribe(&mut self) -> Receiver<RegistryEvent> {
        self.observers.subscribe()
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Live partition, in display order
    pub fn tabs(&self) -> &[TabEntity] {
        &self.tabs
    }

    pub fn archived_tabs(&self) -> &[TabEntity] {
        &self.archived
    }

    /// Total number of tabs in both partitions
    pub fn tab_count(&self) -> usize {
        self.tabs.len() + self.archived.len()
    }

    /// Tabs currently holding an engine handle
    pub fn live_handle_count(&self) -> usize {
        self.all_tabs().filter(|t| t.has_engine_handle()).count()
    }

    pub fn foreground_id(&self) -> Option<TabId> {
        self.foreground
    }

    pub fn foreground(&self) -> Option<&TabEntity> {
        self.foreground.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: TabId) -> Option<&TabEntity> {
        self.all_tabs().find(|t| t.id() == id)
    }

    pub fn get_mut(&mut self, id: TabId) -> Option<&mut TabEntity> {
        self.tabs
            .iter_mut()
            .chain(self.archived.iter_mut())
            .find(|t| t.id() == id)
    }

    pub fn contains(&self, id: TabId) -> bool {
        self.get(id).is_some()
    }

    pub fn is_archived(&self, id: TabId) -> bool {
        self.archived.iter().any(|t| t.id() == id)
    }

    /// Index of `id` in the live partition
    pub fn index_of(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id() == id)
    }

    /// Recently closed tabs, most recent first
    pub fn recently_closed(&self) -> impl Iterator<Item = &ClosedTab> {
        self.recently_closed.iter()
    }

    pub(super) fn all_tabs(&self) -> impl Iterator<Item = &TabEntity> {
        self.tabs.iter().chain(self.archived.iter())
    }

    fn tab_mut(&mut self, id: TabId) -> Result<&mut TabEntity, RegistryError> {
        self.get_mut(id).ok_or(RegistryError::UnknownTab(id))
    }

    // ------------------------------------------------------------------
    // Open / select / close
    // ------------------------------------------------------------------

    /// Open a tab without materializing it.
    ///
    /// A child joins its parent's group and is placed right after it. A
    /// parent that no longer exists is ignored and the tab starts a new group.
    pub fn open(&mut self, url: &str, parent: Option<TabId>, incognito: bool) -> TabId {
        self.open_at(url, parent, incognito, Utc::now())
    }

    pub fn open_at(
        &mut self,
        url: &str,
        parent: Option<TabId>,
        incognito: bool,
        now: DateTime<Utc>,
    ) -> TabId {
        let parent_tab = parent.and_then(|id| self.get(id));
        if let (Some(id), None) = (parent, parent_tab) {
            log::warn!("Parent tab {} is gone, opening as a new group", id);
        }
        let tab = TabEntity::new(url, parent_tab, incognito, now);
        let id = tab.id();

        let index = parent
            .and_then(|p| self.index_of(p))
            .map(|idx| idx + 1)
            .unwrap_or(self.tabs.len());
        self.tabs.insert(index, tab);

        log::info!(
            "Opened tab {} at index {} (total: {})",
            id,
            index,
            self.tab_count()
        );
        self.observers.notify(RegistryEvent::Opened { id });
        id
    }

    /// Bring a tab to the foreground and make sure it has an engine handle.
    ///
    /// Archived tabs are moved back into the live partition first. The tab
    /// stays selected even if materializing fails; the error is returned so
    /// the caller can show it, and the next select retries.
    pub fn select(&mut self, id: TabId) -> Result<MaterializeOutcome, RegistryError> {
        self.select_at(id, Utc::now())
    }

    pub fn select_at(
        &mut self,
        id: TabId,
        now: DateTime<Utc>,
    ) -> Result<MaterializeOutcome, RegistryError> {
        if !self.contains(id) {
            return Err(RegistryError::UnknownTab(id));
        }
        if self.is_archived(id) {
            self.unarchive(id);
        }

        if let Some(previous) = self.foreground.filter(|p| *p != id)
            && let Some(tab) = self.get_mut(previous)
        {
            tab.set_foreground(false);
        }
        self.foreground = Some(id);

        let engine = self.engine.as_ref();
        let scripts = &self.scripts;
        let tab = self
            .tabs
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or(RegistryError::UnknownTab(id))?;
        tab.set_foreground(true);
        tab.touch(now);
        let outcome = tab.materialize(engine, scripts);

        log::debug!("Selected tab {}", id);
        self.observers.notify(RegistryEvent::Selected { id });
        Ok(outcome?)
    }

    /// Move an archived tab back into the live partition at the index it
    /// left, or at the end when that index is gone
    pub fn unarchive(&mut self, id: TabId) -> bool {
        let Some(idx) = self.archived.iter().position(|t| t.id() == id) else {
            return false;
        };
        let tab = self.archived.remove(idx);
        let index = self.insert_unarchived(tab);
        log::info!("Unarchived tab {} to index {}", id, index);
        self.observers.notify(RegistryEvent::Unarchived { id });
        true
    }

    pub(super) fn insert_unarchived(&mut self, mut tab: TabEntity) -> usize {
        let index = tab
            .archived_index
            .take()
            .map_or(self.tabs.len(), |i| i.min(self.tabs.len()));
        self.tabs.insert(index, tab);
        index
    }

    /// Close a tab for good.
    ///
    /// If it was the foreground tab the neighbour at the same index (or the
    /// previous one at the end) takes over. Artifacts are discarded and
    /// non-incognito tabs go to the recently-closed list.
    pub fn close(&mut self, id: TabId) -> Result<ClosedTab, RegistryError> {
        let (tab, live_index) = if let Some(idx) = self.index_of(id) {
            (self.tabs.remove(idx), Some(idx))
        } else if let Some(idx) = self.archived.iter().position(|t| t.id() == id) {
            (self.archived.remove(idx), None)
        } else {
            return Err(RegistryError::UnknownTab(id));
        };

        log::info!("Closing tab {} (index {:?})", id, live_index);
        let closed = tab.close();

        if let Some(store) = &self.artifacts
            && let Err(e) = store.discard(id)
        {
            log::warn!("Failed to discard artifacts for tab {}: {:#}", id, e);
        }

        if !closed.is_incognito && self.config.recently_closed_limit > 0 {
            self.recently_closed.push_front(closed.clone());
            self.recently_closed
                .truncate(self.config.recently_closed_limit);
        }

        self.observers.notify(RegistryEvent::Closed { id });

        if self.foreground == Some(id) {
            self.foreground = None;
            if !self.tabs.is_empty() {
                let new_idx = live_index
                    .unwrap_or(0)
                    .min(self.tabs.len().saturating_sub(1));
                let next = self.tabs[new_idx].id();
                if let Err(e) = self.select(next) {
                    log::warn!("Tab {} took the foreground but did not load: {}", next, e);
                }
            }
        }

        Ok(closed)
    }

    /// Reopen the most recently closed tab and select it
    pub fn reopen_last_closed(&mut self) -> Option<TabId> {
        let closed = self.recently_closed.pop_front()?;
        let parent = closed.parent_id.filter(|p| self.contains(*p));
        let id = self.open(&closed.url, parent, false);
        if let Some(tab) = self.get_mut(id) {
            tab.set_title(closed.title);
            tab.set_favicon(closed.favicon);
        }
        if let Err(e) = self.select(id) {
            log::warn!("Reopened tab {} did not load: {}", id, e);
        }
        Some(id)
    }

    /// Move a tab to a specific index in the live partition.
    /// Returns true if the tab was actually moved.
    pub fn move_tab(&mut self, id: TabId, target_index: usize) -> bool {
        let Some(current_idx) = self.index_of(id) else {
            return false;
        };

        let clamped_target = target_index.min(self.tabs.len().saturating_sub(1));
        if clamped_target == current_idx {
            return false;
        }

        let tab = self.tabs.remove(current_idx);
        self.tabs.insert(clamped_target, tab);
        log::debug!(
            "Moved tab {} from index {} to {}",
            id,
            current_idx,
            clamped_target
        );
        self.observers.notify(RegistryEvent::Moved {
            id,
            index: clamped_target,
        });
        true
    }

    // ------------------------------------------------------------------
    // Per-tab operations
    // ------------------------------------------------------------------

    pub fn navigate(&mut self, id: TabId, url: &str) -> Result<(), RegistryError> {
        Ok(self.tab_mut(id)?.navigate(url)?)
    }

    pub fn go_back(&mut self, id: TabId) -> Result<BackNavigation, RegistryError> {
        Ok(self.tab_mut(id)?.go_back()?)
    }

    pub fn attach_query(&mut self, id: TabId, query: QueryMetadata) -> Result<(), RegistryError> {
        Ok(self.tab_mut(id)?.attach_query(query)?)
    }

    pub fn set_pending_query(
        &mut self,
        id: TabId,
        query: QueryMetadata,
    ) -> Result<(), RegistryError> {
        self.tab_mut(id)?.set_pending_query(query);
        Ok(())
    }

    pub fn set_pinned(&mut self, id: TabId, pinned: bool) -> Result<(), RegistryError> {
        self.tab_mut(id)?.set_pinned(pinned, Utc::now());
        self.observers.notify(RegistryEvent::Updated { id });
        Ok(())
    }

    /// Answer the dialog at the head of a tab's prompt queue
    pub fn respond_to_prompt(
        &mut self,
        id: TabId,
        response: PromptResponse,
    ) -> Result<bool, RegistryError> {
        Ok(self.tab_mut(id)?.prompts_mut().respond(response))
    }

    /// Release one tab's engine handle
    pub fn evict(&mut self, id: TabId) -> Result<EvictOutcome, RegistryError> {
        let outcome = self.tab_mut(id)?.evict()?;
        if outcome != EvictOutcome::AlreadyEvicted {
            self.observers.notify(RegistryEvent::Evicted {
                id,
                cold: outcome == EvictOutcome::EvictedCold,
            });
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Engine callbacks
    // ------------------------------------------------------------------

    /// Apply one engine callback.
    ///
    /// Events for closed tabs, or from a handle generation the tab has
    /// already moved past, are ignored.
    pub fn handle_engine_event(&mut self, event: EngineEvent) -> Option<TabChange> {
        let EngineEvent {
            tab: id,
            generation,
            kind,
        } = event;

        let Some(tab) = self.get_mut(id) else {
            log::debug!("Ignoring engine event for closed tab {}", id);
            return None;
        };
        if generation != tab.generation() || !tab.has_engine_handle() {
            log::debug!(
                "Ignoring stale engine event for tab {} (generation {}, current {})",
                id,
                generation,
                tab.generation()
            );
            return None;
        }

        let change = tab.handle_event(kind)?;
        let event = match &change {
            TabChange::Materialized => RegistryEvent::Materialized { id },
            TabChange::MaterializeFailed(error) => RegistryEvent::MaterializeFailed {
                id,
                error: error.clone(),
            },
            _ => RegistryEvent::Updated { id },
        };
        self.observers.notify(event);
        Some(change)
    }

    /// Apply every queued engine callback. Returns how many were applied.
    pub fn drain_events(&mut self, events: &Receiver<EngineEvent>) -> usize {
        let mut applied = 0;
        while let Ok(event) = events.try_recv() {
            if self.handle_engine_event(event).is_some() {
                applied += 1;
            }
        }
        applied
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Snapshot the whole non-incognito collection, live partition first
    pub fn capture_session(&self) -> PersistedSession {
        capture_session(self.all_tabs(), self.foreground)
    }

    /// Write the collection to durable storage.
    ///
    /// With a background writer the write is queued and this returns as
    /// soon as the capture is done. Returns the number of tabs captured.
    pub fn persist_all(&mut self) -> Result<usize> {
        let session = self.capture_session();
        let count = session.tabs.len();
        match &mut self.writer {
            Some(writer) => writer.submit(session),
            None => save_session_to(&session, &self.session_path)?,
        }
        self.observers.notify(RegistryEvent::Persisted { tabs: count });
        Ok(count)
    }

    /// Rebuild the collection from durable storage and select the tab that
    /// was in the foreground.
    ///
    /// Unreadable records and records duplicating a tab already present are
    /// skipped. Tabs with a broken snapshot come back cold. Tabs that were
    /// archived when saved go back to the archived partition, then the
    /// restored collection is swept against the current retention.
    pub fn restore_all(&mut self) -> Result<RestoreSummary> {
        self.restore_all_at(Utc::now())
    }

    pub fn restore_all_at(&mut self, now: DateTime<Utc>) -> Result<RestoreSummary> {
        let Some(loaded) = load_session_from(&self.session_path)? else {
            log::info!("No saved session at {:?}", self.session_path);
            return Ok(RestoreSummary::default());
        };

        let mut summary = RestoreSummary {
            skipped: loaded.skipped,
            ..RestoreSummary::default()
        };
        let mut seen: HashSet<TabId> = self.all_tabs().map(|t| t.id()).collect();
        let mut restored_ids = HashSet::new();

        for record in loaded.session.tabs {
            if !seen.insert(record.id) {
                log::warn!("Session restore: duplicate tab id {}, skipping", record.id);
                summary.skipped += 1;
                continue;
            }
            let Some(restored) = restore_tab(record) else {
                summary.skipped += 1;
                continue;
            };
            if restored.degraded {
                summary.degraded += 1;
            }
            summary.restored += 1;
            restored_ids.insert(restored.tab.id());
            if restored.tab.archived_index.is_some() {
                self.archived.push(restored.tab);
            } else {
                self.tabs.push(restored.tab);
            }
        }

        let retention = self.config.archival_retention;
        self.run_archival_sweep(now, retention);
        summary.archived = self
            .archived
            .iter()
            .filter(|t| restored_ids.contains(&t.id()))
            .count();

        if let Some(selected) = loaded.session.selected.filter(|id| self.contains(*id))
            && let Err(e) = self.select_at(selected, now)
        {
            log::warn!("Restored foreground tab {} did not load: {}", selected, e);
        }

        log::info!(
            "Restored {} tabs ({} skipped, {} degraded, {} archived)",
            summary.restored,
            summary.skipped,
            summary.degraded,
            summary.archived
        );
        self.observers.notify(RegistryEvent::Restored {
            tabs: summary.restored,
            skipped: summary.skipped,
        });
        Ok(summary)
    }

    /// The app is moving to the background: persist and give in-flight
    /// writes the configured grace period to finish.
    ///
    /// Must be called from outside the writer's runtime.
    pub fn on_app_background(&mut self) -> Result<Option<FlushReport>> {
        if !self.config.persist_on_background {
            return Ok(None);
        }
        self.persist_all()?;
        let grace = self.config.persist_grace_period();
        Ok(self.writer.as_ref().map(|w| w.flush(grace)))
    }
}

impl std::fmt::Debug for TabRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabRegistry")
            .field("tabs", &self.tabs.len())
            .field("archived", &self.archived.len())
            .field("foreground", &self.foreground)
            .field("recently_closed", &self.recently_closed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::HeadlessEngine;
    use crate::tab::HandleState;

    fn registry() -> (TabRegistry, Receiver<EngineEvent>) {
        let (engine, rx) = HeadlessEngine::new(50);
        (TabRegistry::new(Box::new(engine), Config::default()), rx)
    }

    #[test]
    fn test_open_does_not_materialize() {
        let (mut reg, _rx) = registry();
        let id = reg.open("https://a.test/", None, false);
        assert_eq!(reg.get(id).unwrap().handle_state(), HandleState::Cold);
        assert_eq!(reg.live_handle_count(), 0);
    }

    #[test]
    fn test_child_is_inserted_after_parent() {
        let (mut reg, _rx) = registry();
        let a = reg.open("https://a.test/", None, false);
        let b = reg.open("https://b.test/", None, false);
        let child = reg.open("https://a.test/child", Some(a), false);

        let order: Vec<TabId> = reg.tabs().iter().map(|t| t.id()).collect();
        assert_eq!(order, vec![a, child, b]);
        assert_eq!(reg.get(child).unwrap().root_id(), a);
    }

    #[test]
    fn test_missing_parent_starts_new_group() {
        let (mut reg, _rx) = registry();
        let ghost = TabId::new();
        let id = reg.open("https://a.test/", Some(ghost), false);
        let tab = reg.get(id).unwrap();
        assert_eq!(tab.root_id(), id);
        assert_eq!(tab.parent_id(), None);
    }

    #[test]
    fn test_select_moves_foreground() {
        let (mut reg, rx) = registry();
        let a = reg.open("https://a.test/", None, false);
        let b = reg.open("https://b.test/", None, false);

        reg.select(a).unwrap();
        reg.drain_events(&rx);
        reg.select(b).unwrap();
        reg.drain_events(&rx);

        assert_eq!(reg.foreground_id(), Some(b));
        assert!(!reg.get(a).unwrap().is_foreground());
        assert!(reg.get(b).unwrap().is_live());
        assert!(matches!(reg.evict(b), Err(RegistryError::Tab(TabError::Foreground(_)))));
        assert_eq!(reg.evict(a).unwrap(), EvictOutcome::Evicted);
    }

    #[test]
    fn test_close_foreground_picks_neighbour() {
        let (mut reg, rx) = registry();
        let a = reg.open("https://a.test/", None, false);
        let b = reg.open("https://b.test/", None, false);
        let c = reg.open("https://c.test/", None, false);
        reg.select(b).unwrap();
        reg.drain_events(&rx);

        reg.close(b).unwrap();
        assert_eq!(reg.foreground_id(), Some(c));
        reg.close(c).unwrap();
        assert_eq!(reg.foreground_id(), Some(a));
        reg.close(a).unwrap();
        assert_eq!(reg.foreground_id(), None);
        assert_eq!(reg.tab_count(), 0);
    }

    #[test]
    fn test_recently_closed_is_bounded_and_skips_incognito() {
        let (engine, _rx) = HeadlessEngine::new(50);
        let config = Config {
            recently_closed_limit: 2,
            ..Config::default()
        };
        let mut reg = TabRegistry::new(Box::new(engine), config);

        for url in ["https://1.test/", "https://2.test/", "https://3.test/"] {
            let id = reg.open(url, None, false);
            reg.close(id).unwrap();
        }
        let secret = reg.open("https://secret.test/", None, true);
        reg.close(secret).unwrap();

        let urls: Vec<&str> = reg.recently_closed().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["https://3.test/", "https://2.test/"]);

        let reopened = reg.reopen_last_closed().unwrap();
        assert_eq!(reg.get(reopened).unwrap().url(), "https://3.test/");
        assert_eq!(reg.foreground_id(), Some(reopened));
        assert_eq!(reg.recently_closed().count(), 1);
    }

    #[test]
    fn test_move_tab_clamps_target() {
        let (mut reg, _rx) = registry();
        let a = reg.open("https://a.test/", None, false);
        let b = reg.open("https://b.test/", None, false);
        assert!(reg.move_tab(a, 10));
        assert_eq!(reg.index_of(a), Some(1));
        assert_eq!(reg.index_of(b), Some(0));
        assert!(!reg.move_tab(a, 1));
    }

    #[test]
    fn test_events_are_published_after_commit() {
        let (mut reg, rx) = registry();
        let events = reg.subscribe();
        let id = reg.open("https://a.test/", None, false);
        reg.select(id).unwrap();
        reg.drain_events(&rx);

        let seen: Vec<RegistryEvent> = events.try_iter().collect();
        assert_eq!(
            seen,
            vec![
                RegistryEvent::Opened { id },
                RegistryEvent::Selected { id },
                RegistryEvent::Materialized { id },
            ]
        );
    }
}
