//! Core `Config` struct and its `Default` impl.

use crate::error::ConfigError;
use crate::types::ArchivalRetention;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings that drive tab eviction, archival, and session persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// How long unpinned tabs are kept before the archival sweep moves them out
    #[serde(default = "crate::defaults::archival_retention")]
    pub archival_retention: ArchivalRetention,

    /// Share of evictable live handles released on a memory warning (0.0-1.0)
    #[serde(default = "crate::defaults::reclaim_warning_fraction")]
    pub reclaim_warning_fraction: f32,

    /// Share of evictable live handles released on critical memory pressure (0.0-1.0)
    #[serde(default = "crate::defaults::reclaim_critical_fraction")]
    pub reclaim_critical_fraction: f32,

    /// Maximum number of entries kept in the recently-closed list
    #[serde(default = "crate::defaults::recently_closed_limit")]
    pub recently_closed_limit: usize,

    /// How long in-flight session writes may run once the app is backgrounded
    #[serde(default = "crate::defaults::persist_grace_period_ms")]
    pub persist_grace_period_ms: u64,

    /// Persist the tab collection whenever the app moves to the background
    #[serde(default = "crate::defaults::bool_true")]
    pub persist_on_background: bool,

    /// Back/forward entries kept per tab by the headless engine
    #[serde(default = "crate::defaults::max_history_entries")]
    pub max_history_entries: usize,

    /// Override for the session file location (None = default XDG path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_path: Option<PathBuf>,

    /// Directory for per-tab screenshots (None = screenshots disabled)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            archival_retention: crate::defaults::archival_retention(),
            reclaim_warning_fraction: crate::defaults::reclaim_warning_fraction(),
            reclaim_critical_fraction: crate::defaults::reclaim_critical_fraction(),
            recently_closed_limit: crate::defaults::recently_closed_limit(),
            persist_grace_period_ms: crate::defaults::persist_grace_period_ms(),
            persist_on_background: crate::defaults::bool_true(),
            max_history_entries: crate::defaults::max_history_entries(),
            session_path: None,
            screenshot_dir: None,
        }
    }
}

impl Config {
    /// Check field values that serde cannot constrain on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("reclaim_warning_fraction", self.reclaim_warning_fraction),
            ("reclaim_critical_fraction", self.reclaim_critical_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }
        if self.max_history_entries == 0 {
            return Err(ConfigError::Validation(
                "max_history_entries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder-style override of the retention setting
    pub fn with_retention(mut self, retention: ArchivalRetention) -> Self {
        self.archival_retention = retention;
        self
    }

    /// Grace period as a `Duration`
    pub fn persist_grace_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.persist_grace_period_ms)
    }
}
