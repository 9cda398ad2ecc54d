//! Helpers for restoring session state

use super::codec::decode_restore_url;
use super::{PersistedTab, SessionSnapshot};
use crate::tab::TabEntity;

/// Validate a persisted snapshot, dropping it if it no longer decodes.
///
/// Returns the snapshot to keep and whether it had to be dropped.
pub fn validate_snapshot(snapshot: Option<SessionSnapshot>) -> (Option<SessionSnapshot>, bool) {
    let Some(snapshot) = snapshot else {
        return (None, false);
    };
    match decode_restore_url(&snapshot.restore_url) {
        Ok(_) => (Some(snapshot), false),
        Err(e) => {
            log::warn!(
                "Session restore: snapshot for '{}' is unusable ({}), reloading URL only",
                snapshot.current_url,
                e
            );
            (None, true)
        }
    }
}

/// A tab rebuilt from its record
pub struct RestoredTab {
    pub tab: TabEntity,
    /// The snapshot failed to decode and the tab will load its bare URL
    pub degraded: bool,
}

/// Rebuild a tab from `record`.
///
/// Returns `None` for incognito records, which should never have been
/// written. A tab whose snapshot is unusable comes back cold, pointing at
/// the snapshot's current URL when it has one.
pub fn restore_tab(mut record: PersistedTab) -> Option<RestoredTab> {
    if record.is_incognito {
        log::warn!("Session restore: ignoring incognito record {}", record.id);
        return None;
    }

    let fallback_url = record
        .session_snapshot
        .as_ref()
        .map(|s| s.current_url.clone())
        .filter(|url| !url.trim().is_empty());
    let (snapshot, degraded) = validate_snapshot(record.session_snapshot.take());
    if degraded && let Some(url) = fallback_url {
        record.url = url;
    }

    Some(RestoredTab {
        tab: TabEntity::from_record(record, snapshot),
        degraded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tab::{HandleState, TabId};
    use chrono::Utc;

    fn record(snapshot: Option<SessionSnapshot>) -> PersistedTab {
        let id = TabId::new();
        PersistedTab {
            id,
            root_id: id,
            parent_id: None,
            url: "https://record.test/".to_string(),
            title: "Record".to_string(),
            is_pinned: true,
            pinned_at: Some(Utc::now()),
            last_active_at: Utc::now(),
            is_incognito: false,
            session_snapshot: snapshot,
            archived_index: None,
        }
    }

    #[test]
    fn test_corrupt_snapshot_becomes_cold_tab() {
        let restored = restore_tab(record(Some(SessionSnapshot {
            restore_url: "internal://local/session-restore?history=garbage".to_string(),
            current_url: "https://current.test/".to_string(),
        })))
        .unwrap();

        assert!(restored.degraded);
        assert_eq!(restored.tab.handle_state(), HandleState::Cold);
        assert_eq!(restored.tab.url(), "https://current.test/");
        assert!(restored.tab.is_pinned());
    }

    #[test]
    fn test_missing_snapshot_is_not_degraded() {
        let restored = restore_tab(record(None)).unwrap();
        assert!(!restored.degraded);
        assert_eq!(restored.tab.url(), "https://record.test/");
    }

    #[test]
    fn test_incognito_record_is_ignored() {
        let mut rec = record(None);
        rec.is_incognito = true;
        assert!(restore_tab(rec).is_none());
    }
}
