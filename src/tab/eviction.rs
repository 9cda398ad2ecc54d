//! Collection-wide policies: memory-pressure reclaim and the archival sweep.

use super::manager::TabRegistry;
use super::{EvictOutcome, RegistryEvent, TabId};
use crate::archival;
use chrono::{DateTime, Utc};
use tabkeep_config::{ArchivalRetention, Config};

/// Memory pressure reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryPressureLevel {
    Normal,
    Warning,
    Critical,
}

impl MemoryPressureLevel {
    /// How many of `eligible` live handles to release at this level
    pub fn reclaim_target(&self, eligible: usize, config: &Config) -> usize {
        let fraction = match self {
            MemoryPressureLevel::Normal => return 0,
            MemoryPressureLevel::Warning => config.reclaim_warning_fraction,
            MemoryPressureLevel::Critical => config.reclaim_critical_fraction,
        };
        let target = (eligible as f64 * f64::from(fraction.clamp(0.0, 1.0))).ceil() as usize;
        target.min(eligible)
    }
}

impl std::str::FromStr for MemoryPressureLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(MemoryPressureLevel::Normal),
            "warning" => Ok(MemoryPressureLevel::Warning),
            "critical" => Ok(MemoryPressureLevel::Critical),
            other => Err(format!("unknown memory pressure level '{other}'")),
        }
    }
}

/// Result of [`TabRegistry::reclaim_memory`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReclaimReport {
    pub level: MemoryPressureLevel,
    /// Live handles that could have been released
    pub eligible: usize,
    pub target: usize,
    /// Tabs released, least recently active first
    pub evicted: Vec<TabId>,
}

/// Result of [`TabRegistry::run_archival_sweep`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub archived: Vec<TabId>,
    pub unarchived: Vec<TabId>,
}

impl TabRegistry {
    /// Release engine handles in response to memory pressure.
    ///
    /// Candidates are live handles that are neither foreground nor pinned,
    /// oldest `last_active_at` first.
    pub fn reclaim_memory(&mut self, level: MemoryPressureLevel) -> ReclaimReport {
        let mut candidates: Vec<(DateTime<Utc>, TabId)> = self
            .all_tabs()
            .filter(|t| t.has_engine_handle() && !t.is_foreground() && !t.is_pinned())
            .map(|t| (t.last_active_at(), t.id()))
            .collect();
        candidates.sort();

        let eligible = candidates.len();
        let target = level.reclaim_target(eligible, &self.config);
        let mut evicted = Vec::with_capacity(target);

        for (_, id) in candidates.into_iter().take(target) {
            match self.evict(id) {
                Ok(EvictOutcome::AlreadyEvicted) => {}
                Ok(_) => evicted.push(id),
                Err(e) => log::warn!("Reclaim could not evict tab {}: {}", id, e),
            }
        }

        if !evicted.is_empty() {
            log::info!(
                "Memory pressure {:?}: released {} of {} eligible handles",
                level,
                evicted.len(),
                eligible
            );
            self.observers.notify(RegistryEvent::MemoryReclaimed {
                level,
                evicted: evicted.len(),
            });
        }

        ReclaimReport {
            level,
            eligible,
            target,
            evicted,
        }
    }

    /// Re-partition the collection by archival verdict.
    ///
    /// Tabs that are now archived release their handle and move to the
    /// archived partition; archived tabs that no longer qualify (pinned
    /// since, or a longer retention) move back to the position they left.
    /// The foreground tab is never archived.
    pub fn run_archival_sweep(
        &mut self,
        now: DateTime<Utc>,
        retention: ArchivalRetention,
    ) -> SweepReport {
        let mut report = SweepReport::default();

        let mut idx = 0;
        while idx < self.tabs.len() {
            let tab = &self.tabs[idx];
            if tab.is_foreground() || !archival::is_archived(tab, now, retention) {
                idx += 1;
                continue;
            }
            let mut tab = self.tabs.remove(idx);
            let id = tab.id();
            if let Err(e) = tab.evict() {
                log::warn!("Archival could not evict tab {}: {}", id, e);
            }
            // Index before this sweep removed anything
            tab.archived_index = Some(idx + report.archived.len());
            self.archived.push(tab);
            report.archived.push(id);
        }

        let mut returning = Vec::new();
        let mut idx = 0;
        while idx < self.archived.len() {
            if archival::is_archived(&self.archived[idx], now, retention) {
                idx += 1;
                continue;
            }
            returning.push(self.archived.remove(idx));
        }
        returning.sort_by_key(|t| t.archived_index.unwrap_or(usize::MAX));
        for tab in returning {
            report.unarchived.push(tab.id());
            self.insert_unarchived(tab);
        }

        for id in &report.archived {
            self.observers.notify(RegistryEvent::Archived { id: *id });
        }
        for id in &report.unarchived {
            self.observers.notify(RegistryEvent::Unarchived { id: *id });
        }
        if !report.archived.is_empty() || !report.unarchived.is_empty() {
            log::info!(
                "Archival sweep ({:?}): {} archived, {} restored",
                retention,
                report.archived.len(),
                report.unarchived.len()
            );
        }
        report
    }
}
