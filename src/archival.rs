//! Archival policy: time-bucket classification and the archived verdict.
//!
//! Everything here is a pure function of its inputs. Buckets are counted in
//! whole UTC calendar days between `last_active_at` and `now`.

use crate::session::PersistedTab;
use crate::tab::TabEntity;
use chrono::{DateTime, Utc};
use tabkeep_config::ArchivalRetention;

/// How recently a tab was used, most recent first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeBucket {
    Today,
    Yesterday,
    LastWeek,
    LastMonth,
    Older,
}

impl TimeBucket {
    /// Section heading for tab lists
    pub fn display_name(&self) -> &'static str {
        match self {
            TimeBucket::Today => "Today",
            TimeBucket::Yesterday => "Yesterday",
            TimeBucket::LastWeek => "Last Week",
            TimeBucket::LastMonth => "Last Month",
            TimeBucket::Older => "Older",
        }
    }

    /// Whether this bucket is kept under `retention`
    pub fn within(&self, retention: ArchivalRetention) -> bool {
        match retention {
            ArchivalRetention::Week => *self <= TimeBucket::LastWeek,
            ArchivalRetention::Month => *self <= TimeBucket::LastMonth,
            ArchivalRetention::Forever => true,
        }
    }
}

impl std::fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The inputs archival looks at
pub trait ArchivalSubject {
    fn last_active_at(&self) -> DateTime<Utc>;
    fn is_pinned(&self) -> bool;
}

impl ArchivalSubject for TabEntity {
    fn last_active_at(&self) -> DateTime<Utc> {
        TabEntity::last_active_at(self)
    }

    fn is_pinned(&self) -> bool {
        TabEntity::is_pinned(self)
    }
}

impl ArchivalSubject for PersistedTab {
    fn last_active_at(&self) -> DateTime<Utc> {
        self.last_active_at
    }

    fn is_pinned(&self) -> bool {
        self.is_pinned
    }
}

/// Bucket for a raw timestamp. Timestamps after `now` count as today.
pub fn bucket_for(last_active_at: DateTime<Utc>, now: DateTime<Utc>) -> TimeBucket {
    let days = (now.date_naive() - last_active_at.date_naive()).num_days();
    match days {
        ..=0 => TimeBucket::Today,
        1 => TimeBucket::Yesterday,
        2..=7 => TimeBucket::LastWeek,
        8..=30 => TimeBucket::LastMonth,
        _ => TimeBucket::Older,
    }
}

/// Classify a tab by how recently it was active.
///
/// The retention setting does not move bucket boundaries; it is accepted so
/// callers can classify and judge with the same arguments.
pub fn classify<T: ArchivalSubject + ?Sized>(
    tab: &T,
    now: DateTime<Utc>,
    _retention: ArchivalRetention,
) -> TimeBucket {
    bucket_for(tab.last_active_at(), now)
}

/// Whether `tab` belongs in the archived partition. Pinned tabs never do.
pub fn is_archived<T: ArchivalSubject + ?Sized>(
    tab: &T,
    now: DateTime<Utc>,
    retention: ArchivalRetention,
) -> bool {
    if tab.is_pinned() {
        return false;
    }
    !classify(tab, now, retention).within(retention)
}
