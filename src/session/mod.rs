//! Session state types for eviction, relaunch, and restore.
//!
//! A tab whose engine handle is released keeps a [`SessionSnapshot`]: the
//! restore pseudo-URL that rebuilds its back/forward list, plus the URL of
//! the page that was current. The whole non-incognito collection is written
//! as one [`PersistedSession`] at lifecycle boundaries and read back at launch.

pub mod capture;
pub mod codec;
pub mod query;
pub mod restore;
pub mod storage;
pub mod writer;

pub use codec::{RESTORE_URL_PREFIX, SnapshotError, decode, encode, is_restore_url};
pub use query::{QueryForNavigationTracker, QueryLocation, QueryMetadata};
pub use writer::{FlushReport, SessionWriter};

use crate::tab::TabId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Serialized navigation state of one tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// `internal://local/session-restore?history=...` instruction
    pub restore_url: String,
    /// URL of the current entry at capture time, used when decoding fails
    pub current_url: String,
}

/// Engine-agnostic instruction for rebuilding a back/forward list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreRequest {
    /// History in order, oldest first
    pub urls: Vec<String>,
    /// Index into `urls` of the entry to show
    pub current_index: usize,
    /// Query metadata aligned with `urls`
    pub queries: Vec<Option<QueryMetadata>>,
    /// True when the snapshot could not be decoded and only the current URL survived
    pub degraded: bool,
}

impl RestoreRequest {
    /// A one-entry request used when the full history is unavailable.
    pub fn single(url: impl Into<String>, degraded: bool) -> Self {
        Self {
            urls: vec![url.into()],
            current_index: 0,
            queries: vec![None],
            degraded,
        }
    }

    pub fn current_url(&self) -> Option<&str> {
        self.urls.get(self.current_index).map(String::as_str)
    }
}

/// The full persisted tab collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    /// When the session was captured
    pub saved_at: DateTime<Utc>,
    /// Foreground tab at save time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<TabId>,
    /// Tabs in display order (live partition first, then archived)
    pub tabs: Vec<PersistedTab>,
}

/// A single tab record in the persisted collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTab {
    pub id: TabId,
    pub root_id: TabId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TabId>,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_at: Option<DateTime<Utc>>,
    pub last_active_at: DateTime<Utc>,
    #[serde(default)]
    pub is_incognito: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_snapshot: Option<SessionSnapshot>,
    /// Live-partition index the tab left when it was archived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_index: Option<usize>,
}
