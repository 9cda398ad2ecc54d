//! File I/O for session persistence
//!
//! Sessions are stored in `~/.config/tabkeep/last_session.yaml` unless the
//! config overrides the location. The file is replaced atomically, and
//! individual tab records that no longer deserialize are skipped on load
//! instead of failing the whole restore.

use super::{PersistedSession, PersistedTab};
use crate::tab::TabId;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

/// A loaded session plus how many tab records had to be dropped
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSession {
    pub session: PersistedSession,
    pub skipped: usize,
}

#[derive(Deserialize)]
struct RawSession {
    #[serde(default)]
    saved_at: Option<String>,
    #[serde(default)]
    selected: Option<TabId>,
    #[serde(default)]
    tabs: Vec<serde_yaml_ng::Value>,
}

/// Save session state to a specific file
pub fn save_session_to(state: &PersistedSession, path: &Path) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create session directory {:?}", parent))?;
    }

    let contents = serde_yaml_ng::to_string(state).context("Failed to serialize session state")?;

    // Atomic save: write to temp file then rename to prevent a torn session file
    let temp_path = path.with_extension("yaml.tmp");
    std::fs::write(&temp_path, contents)
        .with_context(|| format!("Failed to write session state to {:?}", temp_path))?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to move session state into place at {:?}", path))?;

    log::info!("Saved session state ({} tabs) to {:?}", state.tabs.len(), path);
    Ok(())
}

/// Load session state from a specific file
///
/// Returns `None` if the file doesn't exist or is empty.
/// Returns an error if the file exists but its outer structure is corrupt.
pub fn load_session_from(path: &Path) -> Result<Option<LoadedSession>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read session state from {:?}", path))?;

    if contents.trim().is_empty() {
        return Ok(None);
    }

    let raw: RawSession = serde_yaml_ng::from_str(&contents)
        .with_context(|| format!("Failed to parse session state from {:?}", path))?;

    let mut skipped = 0;
    let mut tabs = Vec::with_capacity(raw.tabs.len());
    for (index, value) in raw.tabs.into_iter().enumerate() {
        match serde_yaml_ng::from_value::<PersistedTab>(value) {
            Ok(tab) => tabs.push(tab),
            Err(e) => {
                skipped += 1;
                log::warn!("Skipping unreadable tab record {} in {:?}: {}", index, path, e);
            }
        }
    }

    let saved_at = match raw.saved_at.as_deref().map(DateTime::parse_from_rfc3339) {
        Some(Ok(saved_at)) => saved_at.with_timezone(&Utc),
        Some(Err(e)) => {
            log::warn!("Unreadable saved_at in {:?}: {}", path, e);
            DateTime::UNIX_EPOCH
        }
        None => DateTime::UNIX_EPOCH,
    };

    log::info!(
        "Loaded session state ({} tabs, {} skipped) from {:?}",
        tabs.len(),
        skipped,
        path
    );
    Ok(Some(LoadedSession {
        session: PersistedSession {
            saved_at,
            selected: raw.selected,
            tabs,
        },
        skipped,
    }))
}

/// Remove a session state file (e.g., after the user chose to start fresh)
pub fn clear_session_at(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove session state file {:?}", path))?;
    }
    Ok(())
}
