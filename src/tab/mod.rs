//! Tab management for lazily materialized browsing contexts
//!
//! This module provides the core tab infrastructure including:
//! - `TabEntity`: One browsing context with its identity, display state, and
//!   a droppable engine handle
//! - `TabRegistry`: Owns every tab, drives eviction, archival, and persistence
//! - `TabId`: Unique identifier for each tab

mod eviction;
mod lifecycle;
mod manager;
mod notify;
mod prompts;

pub use eviction::{MemoryPressureLevel, ReclaimReport, SweepReport};
pub use lifecycle::{BackNavigation, ClosedTab, EvictOutcome, MaterializeOutcome, TabChange};
pub use manager::{RegistryError, RestoreSummary, TabRegistry};
pub use notify::RegistryEvent;
pub use prompts::{PromptQueue, PromptResponder, PromptResponse};

use crate::engine::{EngineError, EngineHandle, HistoryList};
use crate::session::{PersistedTab, QueryForNavigationTracker, QueryMetadata, SessionSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabkeep_scripting::ContentScriptRouter;
use uuid::Uuid;

/// Unique identifier for a tab, stable for the tab's whole life (including
/// across relaunches)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(Uuid);

impl TabId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from operations on a single tab
#[derive(Debug, thiserror::Error)]
pub enum TabError {
    #[error("tab {0} is in the foreground and cannot be evicted")]
    Foreground(TabId),
    #[error("tab {0} has no live engine handle")]
    NotLive(TabId),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// An engine handle together with the script router bound to it.
///
/// The two are created together and torn down together; the router is
/// always emptied before the handle is dropped.
pub(crate) struct AttachedHandle {
    pub(crate) handle: Box<dyn EngineHandle>,
    pub(crate) router: ContentScriptRouter,
}

impl AttachedHandle {
    /// Tear down the router, then drop the handle
    pub(crate) fn release(mut self) {
        let removed = self.router.unregister_all();
        log::trace!("Unregistered {} content script(s) before release", removed);
        drop(self.handle);
    }
}

/// What is waiting on a `Pending` handle before it counts as live
pub(crate) enum PendingLoad {
    /// A direct load of the tab's URL
    Url,
    /// A history restore; the snapshot is kept until the engine confirms it
    Restore {
        snapshot: SessionSnapshot,
        queries: Vec<Option<QueryMetadata>>,
    },
}

/// Where a tab's engine resources currently stand.
///
/// Exactly one variant holds at a time, so a tab can never be live while
/// also carrying a snapshot.
pub(crate) enum EngineSlot {
    /// Handle created and its first load committed
    Live(AttachedHandle),
    /// Handle created, initial load or restore still in flight
    Pending {
        attached: AttachedHandle,
        load: PendingLoad,
    },
    /// No handle. `Some` snapshot for an evicted tab, `None` for a brand-new
    /// or cold tab that only has its URL.
    Zombie(Option<SessionSnapshot>),
}

/// Public view of a tab's engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Live,
    Materializing,
    /// Evicted with a restorable snapshot
    Zombie,
    /// No handle and no snapshot; will load its bare URL
    Cold,
}

/// One browsing context
pub struct TabEntity {
    id: TabId,
    root_id: TabId,
    parent_id: Option<TabId>,
    url: String,
    title: String,
    favicon: Option<String>,
    is_pinned: bool,
    pinned_at: Option<DateTime<Utc>>,
    is_incognito: bool,
    last_active_at: DateTime<Utc>,
    pub(crate) slot: EngineSlot,
    pub(crate) queries: QueryForNavigationTracker,
    /// Query typed for a navigation that has not committed yet
    pub(crate) pending_query: Option<QueryMetadata>,
    /// Bumped on every handle creation and release
    pub(crate) generation: u64,
    pub(crate) is_foreground: bool,
    pub(crate) prompts: PromptQueue,
    find_results: Option<(u32, u32)>,
    /// Where the tab sat in the live partition before it was archived
    pub(crate) archived_index: Option<usize>,
}

impl TabEntity {
    /// Create a brand-new tab that has a URL and no engine handle yet.
    ///
    /// A child tab joins its parent's group.
    pub fn new(
        url: impl Into<String>,
        parent: Option<&TabEntity>,
        is_incognito: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let id = TabId::new();
        let (root_id, parent_id) = match parent {
            Some(parent) => (parent.root_id, Some(parent.id)),
            None => (id, None),
        };
        Self::assemble(
            id,
            root_id,
            parent_id,
            url.into(),
            String::new(),
            is_incognito,
            now,
            None,
        )
    }

    /// Rebuild a tab from its persisted record.
    ///
    /// The caller has already validated `snapshot`.
    pub(crate) fn from_record(record: PersistedTab, snapshot: Option<SessionSnapshot>) -> Self {
        let mut tab = Self::assemble(
            record.id,
            record.root_id,
            record.parent_id,
            record.url,
            record.title,
            record.is_incognito,
            record.last_active_at,
            snapshot,
        );
        tab.is_pinned = record.is_pinned;
        tab.pinned_at = record.pinned_at.filter(|_| record.is_pinned);
        tab.archived_index = record.archived_index;
        tab
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        id: TabId,
        root_id: TabId,
        parent_id: Option<TabId>,
        url: String,
        title: String,
        is_incognito: bool,
        last_active_at: DateTime<Utc>,
        snapshot: Option<SessionSnapshot>,
    ) -> Self {
        Self {
            id,
            root_id,
            parent_id,
            url,
            title,
            favicon: None,
            is_pinned: false,
            pinned_at: None,
            is_incognito,
            last_active_at,
            slot: EngineSlot::Zombie(snapshot),
            queries: QueryForNavigationTracker::new(),
            pending_query: None,
            generation: 0,
            is_foreground: false,
            prompts: PromptQueue::new(),
            find_results: None,
            archived_index: None,
        }
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn root_id(&self) -> TabId {
        self.root_id
    }

    pub fn parent_id(&self) -> Option<TabId> {
        self.parent_id
    }

    /// Last known URL
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn favicon(&self) -> Option<&str> {
        self.favicon.as_deref()
    }

    pub fn is_pinned(&self) -> bool {
        self.is_pinned
    }

    pub fn pinned_at(&self) -> Option<DateTime<Utc>> {
        self.pinned_at
    }

    pub fn is_incognito(&self) -> bool {
        self.is_incognito
    }

    pub fn last_active_at(&self) -> DateTime<Utc> {
        self.last_active_at
    }

    pub fn is_foreground(&self) -> bool {
        self.is_foreground
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Find-in-page position as `(current, total)`
    pub fn find_results(&self) -> Option<(u32, u32)> {
        self.find_results
    }

    pub fn queries(&self) -> &QueryForNavigationTracker {
        &self.queries
    }

    pub fn prompts(&self) -> &PromptQueue {
        &self.prompts
    }

    pub fn prompts_mut(&mut self) -> &mut PromptQueue {
        &mut self.prompts
    }

    pub fn handle_state(&self) -> HandleState {
        match &self.slot {
            EngineSlot::Live(_) => HandleState::Live,
            EngineSlot::Pending { .. } => HandleState::Materializing,
            EngineSlot::Zombie(Some(_)) => HandleState::Zombie,
            EngineSlot::Zombie(None) => HandleState::Cold,
        }
    }

    /// Back/forward list of the engine handle, if there is one
    pub fn history(&self) -> Option<HistoryList> {
        match &self.slot {
            EngineSlot::Live(attached) | EngineSlot::Pending { attached, .. } => {
                Some(attached.handle.history())
            }
            EngineSlot::Zombie(_) => None,
        }
    }

    /// Whether an engine handle exists (live or still loading)
    pub fn has_engine_handle(&self) -> bool {
        !matches!(self.slot, EngineSlot::Zombie(_))
    }

    pub fn is_live(&self) -> bool {
        matches!(self.slot, EngineSlot::Live(_))
    }

    /// The stored snapshot of an evicted tab
    pub fn session_state(&self) -> Option<&SessionSnapshot> {
        match &self.slot {
            EngineSlot::Zombie(snapshot) => snapshot.as_ref(),
            _ => None,
        }
    }

    pub fn set_pinned(&mut self, pinned: bool, now: DateTime<Utc>) {
        if self.is_pinned == pinned {
            return;
        }
        self.is_pinned = pinned;
        self.pinned_at = pinned.then_some(now);
        log::debug!("Tab {} pinned={}", self.id, pinned);
    }

    /// Record the query typed for the next navigation this tab commits
    pub fn set_pending_query(&mut self, query: QueryMetadata) {
        self.pending_query = Some(query);
    }

    pub(crate) fn set_foreground(&mut self, foreground: bool) {
        self.is_foreground = foreground;
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.last_active_at = now;
    }

    pub(crate) fn set_url(&mut self, url: String) {
        self.url = url;
    }

    pub(crate) fn set_title(&mut self, title: String) {
        self.title = title;
    }

    pub(crate) fn set_favicon(&mut self, favicon: Option<String>) {
        self.favicon = favicon;
    }

    pub(crate) fn set_find_results(&mut self, current: u32, total: u32) {
        self.find_results = Some((current, total));
    }

    /// Durable record for this tab, or `None` for incognito tabs
    pub fn to_record(&self) -> Option<PersistedTab> {
        if self.is_incognito {
            return None;
        }
        Some(PersistedTab {
            id: self.id,
            root_id: self.root_id,
            parent_id: self.parent_id,
            url: self.url.clone(),
            title: self.title.clone(),
            is_pinned: self.is_pinned,
            pinned_at: self.pinned_at,
            last_active_at: self.last_active_at,
            is_incognito: false,
            session_snapshot: self.capture_session_state(),
            archived_index: self.archived_index,
        })
    }
}

impl std::fmt::Debug for TabEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabEntity")
            .field("id", &self.id)
            .field("root_id", &self.root_id)
            .field("url", &self.url)
            .field("state", &self.handle_state())
            .field("generation", &self.generation)
            .field("is_pinned", &self.is_pinned)
            .field("is_foreground", &self.is_foreground)
            .finish()
    }
}
