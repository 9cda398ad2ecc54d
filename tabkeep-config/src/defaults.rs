//! Default value functions for configuration.
//!
//! Each function is used as a `#[serde(default = "crate::defaults::...")]`
//! attribute on a `Config` field so partial config files keep working.

// ── Primitive helpers ──────────────────────────────────────────────────────

pub fn bool_true() -> bool {
    true
}

// ── Archival ───────────────────────────────────────────────────────────────

pub fn archival_retention() -> crate::types::ArchivalRetention {
    crate::types::ArchivalRetention::Week
}

// ── Memory reclaim ─────────────────────────────────────────────────────────

pub fn reclaim_warning_fraction() -> f32 {
    0.5
}

pub fn reclaim_critical_fraction() -> f32 {
    1.0
}

// ── Session persistence ────────────────────────────────────────────────────

pub fn recently_closed_limit() -> usize {
    10
}

pub fn persist_grace_period_ms() -> u64 {
    5000
}

pub fn max_history_entries() -> usize {
    500
}
