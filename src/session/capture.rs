//! Capture the persistable state of a tab collection

use super::PersistedSession;
use crate::tab::{TabEntity, TabId};

/// Capture every non-incognito tab, in the order given.
///
/// Live tabs are snapshotted from their engine handle; evicted tabs keep
/// the snapshot they already hold. `selected` is dropped if it points at a
/// tab that is not part of the capture (e.g. an incognito tab).
pub fn capture_session<'a>(
    tabs: impl IntoIterator<Item = &'a TabEntity>,
    selected: Option<TabId>,
) -> PersistedSession {
    let tabs: Vec<_> = tabs.into_iter().filter_map(TabEntity::to_record).collect();
    let selected = selected.filter(|id| tabs.iter().any(|t| t.id == *id));

    PersistedSession {
        saved_at: chrono::Utc::now(),
        selected,
        tabs,
    }
}
