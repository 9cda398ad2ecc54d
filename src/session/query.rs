//! Search-query bookkeeping for navigation entries.
//!
//! When a navigation was produced by a search, the typed (and possibly
//! suggested) query is remembered against that entry. Going back from such
//! an entry offers to resume the search instead of stepping back literally.

use crate::engine::NavEntryId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where the query that produced a navigation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryLocation {
    /// A search suggestion was picked
    Suggestion,
    /// The user submitted the text as typed
    Typed,
    /// A history match was picked
    History,
}

/// The query that produced a navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub typed: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested: Option<String>,
    pub location: QueryLocation,
}

impl QueryMetadata {
    pub fn typed(text: impl Into<String>) -> Self {
        Self {
            typed: text.into(),
            suggested: None,
            location: QueryLocation::Typed,
        }
    }

    pub fn suggestion(typed: impl Into<String>, suggested: impl Into<String>) -> Self {
        Self {
            typed: typed.into(),
            suggested: Some(suggested.into()),
            location: QueryLocation::Suggestion,
        }
    }
}

/// Map from navigation entries to the query that produced them.
#[derive(Debug, Clone, Default)]
pub struct QueryForNavigationTracker {
    entries: HashMap<NavEntryId, QueryMetadata>,
}

impl QueryForNavigationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `query` with the committed navigation `nav`, replacing any previous one.
    pub fn attach(&mut self, query: QueryMetadata, nav: NavEntryId) {
        self.entries.insert(nav, query);
    }

    pub fn find(&self, nav: NavEntryId) -> Option<&QueryMetadata> {
        self.entries.get(&nav)
    }

    /// Drop entries whose navigation fell off the engine's back/forward list.
    pub fn prune(&mut self, removed: &[NavEntryId]) {
        for id in removed {
            self.entries.remove(id);
        }
    }

    /// Keep only entries still present in `live`.
    pub fn retain_live(&mut self, live: &[NavEntryId]) {
        self.entries.retain(|id, _| live.contains(id));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
