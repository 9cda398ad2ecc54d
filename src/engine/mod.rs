//! Web engine abstraction.
//!
//! The rendering engine itself lives outside this crate. Tabs only see it
//! through two traits: [`WebEngine`], which builds a handle for a tab, and
//! [`EngineHandle`], the heavyweight per-tab resource that is dropped on
//! eviction or close. Engine callbacks arrive as [`EngineEvent`] values that
//! the host marshals onto the owner thread before handing them to the
//! registry.

pub mod headless;

pub use headless::{HeadlessEngine, HeadlessStats};

use crate::session::RestoreRequest;
use crate::tab::TabId;
use serde::{Deserialize, Serialize};

/// Errors reported by the engine for handle construction and loads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The engine could not build a new handle (out of processes, GPU lost, ...)
    #[error("engine handle construction failed: {0}")]
    HandleCreation(String),
    /// The URL could not be parsed or resolved against the current page
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
    /// A load was rejected before it started
    #[error("load failed: {0}")]
    LoadFailed(String),
    /// A back/forward step was requested with nothing to step to
    #[error("no history entry to navigate to")]
    NoHistoryEntry,
}

/// Identity of one entry in an engine's back/forward list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NavEntryId(pub u64);

/// One committed entry in the back/forward list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: NavEntryId,
    pub url: String,
    pub title: String,
}

/// The back/forward list as reported by a live handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryList {
    pub entries: Vec<HistoryEntry>,
    /// Index of the current entry; meaningless when `entries` is empty
    pub current_index: usize,
}

impl HistoryList {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.current_index)
    }

    pub fn urls(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.url.as_str()).collect()
    }
}

/// Builds engine handles for tabs.
pub trait WebEngine {
    /// Construct a handle for `tab`.
    ///
    /// `generation` is echoed back on every event the handle emits so stale
    /// completions can be told apart from current ones.
    fn create_handle(
        &self,
        tab: TabId,
        generation: u64,
        incognito: bool,
    ) -> Result<Box<dyn EngineHandle>, EngineError>;
}

/// A live rendering-engine instance owned by exactly one tab.
///
/// Dropping the box releases the engine resources.
pub trait EngineHandle: Send {
    /// Start loading `url`. Completion is reported by `NavigationCommitted` or `LoadFailed`.
    fn load(&mut self, url: &str) -> Result<(), EngineError>;

    /// Rebuild the back/forward list from a decoded session snapshot.
    fn restore(&mut self, request: &RestoreRequest) -> Result<(), EngineError>;

    /// Step one entry back in the back/forward list.
    fn go_back(&mut self) -> Result<(), EngineError>;

    /// Current back/forward list.
    fn history(&self) -> HistoryList;
}

/// An engine callback, tagged with the tab and handle generation it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub tab: TabId,
    pub generation: u64,
    pub kind: EngineEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEventKind {
    /// A navigation committed and became the current entry
    NavigationCommitted { entry: HistoryEntry },
    /// The engine rebuilt the back/forward list from a restore request
    RestoreCommitted,
    /// A load (or restore) failed after it started
    LoadFailed { error: String },
    /// The current page changed its title
    TitleChanged { title: String },
    /// Entries fell off the back/forward list
    HistoryPruned { removed: Vec<NavEntryId> },
    /// A raw content-script envelope posted by the page
    ScriptMessage { body: String },
}
