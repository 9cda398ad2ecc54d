//! Encode/decode a tab's back/forward list to and from the restore pseudo-URL.
//!
//! The snapshot is `internal://local/session-restore?history=<JSON>` where the
//! JSON payload is `{"history": [...], "currentPage": <offset>}`. The offset is
//! counted from the end of the list (`0` is the last entry, `-1` the one
//! before it). Query metadata rides along as a sparse `queries` array.

use super::query::{QueryForNavigationTracker, QueryMetadata};
use super::{RestoreRequest, SessionSnapshot};
use crate::engine::HistoryEntry;
use serde::{Deserialize, Serialize};
use url::Url;

/// Scheme, host, and path of the restore instruction
pub const RESTORE_URL_PREFIX: &str = "internal://local/session-restore";

/// URL loaded when a snapshot carries nothing usable at all
pub const BLANK_URL: &str = "about:blank";

const HISTORY_PARAM: &str = "history";

/// Reasons a snapshot cannot be produced or fully decoded.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("history is empty")]
    EmptyHistory,
    #[error("current index {index} is outside history of length {len}")]
    IndexOutOfRange { index: isize, len: usize },
    #[error("current page offset {offset} is outside history of length {len}")]
    InvalidOffset { offset: i64, len: usize },
    #[error("not a session restore URL: {0}")]
    NotRestoreUrl(String),
    #[error("restore URL has no history parameter")]
    MissingHistory,
    #[error("restore URL could not be parsed: {0}")]
    Url(#[from] url::ParseError),
    #[error("restore payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestorePayload {
    history: Vec<String>,
    current_page: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    queries: Vec<IndexedQuery>,
}

#[derive(Serialize, Deserialize)]
struct IndexedQuery {
    index: usize,
    #[serde(flatten)]
    query: QueryMetadata,
}

/// Capture `entries` (with the entry at `current_index` current) into a snapshot.
pub fn encode(
    entries: &[HistoryEntry],
    current_index: isize,
    queries: &QueryForNavigationTracker,
) -> Result<SessionSnapshot, SnapshotError> {
    if entries.is_empty() {
        return Err(SnapshotError::EmptyHistory);
    }
    let len = entries.len();
    if current_index < 0 || current_index as usize >= len {
        return Err(SnapshotError::IndexOutOfRange {
            index: current_index,
            len,
        });
    }
    let current = current_index as usize;

    let payload = RestorePayload {
        history: entries.iter().map(|e| e.url.clone()).collect(),
        current_page: current as i64 - (len as i64 - 1),
        queries: entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                queries.find(entry.id).map(|query| IndexedQuery {
                    index,
                    query: query.clone(),
                })
            })
            .collect(),
    };

    let json = serde_json::to_string(&payload)?;
    let url = Url::parse_with_params(RESTORE_URL_PREFIX, &[(HISTORY_PARAM, json.as_str())])?;

    Ok(SessionSnapshot {
        restore_url: url.to_string(),
        current_url: entries[current].url.clone(),
    })
}

/// Decode a snapshot, falling back to a single-entry request on any failure.
pub fn decode(snapshot: &SessionSnapshot) -> RestoreRequest {
    match decode_restore_url(&snapshot.restore_url) {
        Ok(request) => request,
        Err(e) => {
            log::warn!(
                "Session snapshot could not be decoded ({}), loading current URL only",
                e
            );
            let fallback = if snapshot.current_url.trim().is_empty() {
                BLANK_URL
            } else {
                snapshot.current_url.as_str()
            };
            RestoreRequest::single(fallback, true)
        }
    }
}

/// Strictly decode a restore pseudo-URL.
pub fn decode_restore_url(restore_url: &str) -> Result<RestoreRequest, SnapshotError> {
    let url = Url::parse(restore_url)?;
    if url.scheme() != "internal"
        || url.host_str() != Some("local")
        || url.path() != "/session-restore"
    {
        return Err(SnapshotError::NotRestoreUrl(restore_url.to_string()));
    }

    let json = url
        .query_pairs()
        .find(|(key, _)| key == HISTORY_PARAM)
        .map(|(_, value)| value.into_owned())
        .ok_or(SnapshotError::MissingHistory)?;
    let payload: RestorePayload = serde_json::from_str(&json)?;

    let len = payload.history.len();
    if len == 0 {
        return Err(SnapshotError::EmptyHistory);
    }
    let offset = payload.current_page;
    if offset > 0 || offset.unsigned_abs() as usize >= len {
        return Err(SnapshotError::InvalidOffset { offset, len });
    }
    let current_index = (len as i64 - 1 + offset) as usize;

    let mut queries = vec![None; len];
    for indexed in payload.queries {
        match queries.get_mut(indexed.index) {
            Some(slot) => *slot = Some(indexed.query),
            None => log::debug!(
                "Dropping query for out-of-range history index {}",
                indexed.index
            ),
        }
    }

    Ok(RestoreRequest {
        urls: payload.history,
        current_index,
        queries,
        degraded: false,
    })
}

/// Whether `url` is a restore instruction rather than a real page
pub fn is_restore_url(url: &str) -> bool {
    url.starts_with(RESTORE_URL_PREFIX)
}
