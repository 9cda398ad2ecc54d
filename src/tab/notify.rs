//! Change notifications for registry observers.
//!
//! Events are sent only after the transition they describe has committed,
//! so an observer reading the registry in response sees the new state.

use super::{MemoryPressureLevel, TabId};
use std::sync::mpsc::{Receiver, Sender, channel};

/// A committed registry transition
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    Opened { id: TabId },
    Selected { id: TabId },
    Closed { id: TabId },
    Evicted { id: TabId, cold: bool },
    Materialized { id: TabId },
    MaterializeFailed { id: TabId, error: String },
    Archived { id: TabId },
    Unarchived { id: TabId },
    Moved { id: TabId, index: usize },
    /// A tab's title, favicon, or find state changed
    Updated { id: TabId },
    MemoryReclaimed { level: MemoryPressureLevel, evicted: usize },
    Restored { tabs: usize, skipped: usize },
    Persisted { tabs: usize },
}

/// Fan-out list of subscriber channels
#[derive(Default)]
pub(crate) struct Observers {
    senders: Vec<Sender<RegistryEvent>>,
}

impl Observers {
    pub(crate) fn subscribe(&mut self) -> Receiver<RegistryEvent> {
        let (tx, rx) = channel();
        self.senders.push(tx);
        rx
    }

    /// Deliver `event` to every subscriber, forgetting ones that hung up
    pub(crate) fn notify(&mut self, event: RegistryEvent) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.len()
    }
}
