//! In-process engine with a real back/forward list and no rendering.
//!
//! Used by the CLI demo and the test suite. Every handle reports its
//! callbacks through one `std::sync::mpsc` channel, the same way a real
//! engine bridge would queue callbacks for the owner thread.

use super::{
    EngineError, EngineEvent, EngineEventKind, EngineHandle, HistoryEntry, HistoryList,
    NavEntryId, WebEngine,
};
use crate::session::RestoreRequest;
use crate::tab::TabId;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use url::Url;

/// Shared counters between the engine and its handles
#[derive(Default)]
struct EngineCounters {
    next_entry: AtomicU64,
    live_handles: AtomicUsize,
    created_handles: AtomicUsize,
    failing_creates: AtomicUsize,
}

/// Headless [`WebEngine`] implementation.
pub struct HeadlessEngine {
    events: Sender<EngineEvent>,
    counters: Arc<EngineCounters>,
    max_history: usize,
}

impl HeadlessEngine {
    /// Create an engine and the receiver its events are delivered on.
    ///
    /// `max_history` caps each handle's back/forward list; older entries are
    /// pruned and reported with `HistoryPruned`.
    pub fn new(max_history: usize) -> (Self, Receiver<EngineEvent>) {
        let (events, rx) = channel();
        let engine = Self {
            events,
            counters: Arc::new(EngineCounters::default()),
            max_history: max_history.max(1),
        };
        (engine, rx)
    }

    /// Make the next `count` calls to `create_handle` fail.
    pub fn fail_next_creates(&self, count: usize) {
        self.counters
            .failing_creates
            .store(count, Ordering::SeqCst);
    }

    /// Number of handles currently alive (created and not yet dropped).
    pub fn live_handles(&self) -> usize {
        self.counters.live_handles.load(Ordering::SeqCst)
    }

    /// Number of handles ever created.
    pub fn created_handles(&self) -> usize {
        self.counters.created_handles.load(Ordering::SeqCst)
    }

    /// A cheap observer for handle counts that outlives moving the engine into a registry.
    pub fn stats(&self) -> HeadlessStats {
        HeadlessStats {
            counters: Arc::clone(&self.counters),
        }
    }
}

/// Read-only view of a [`HeadlessEngine`]'s handle counters.
#[derive(Clone)]
pub struct HeadlessStats {
    counters: Arc<EngineCounters>,
}

impl HeadlessStats {
    pub fn live_handles(&self) -> usize {
        self.counters.live_handles.load(Ordering::SeqCst)
    }

    pub fn created_handles(&self) -> usize {
        self.counters.created_handles.load(Ordering::SeqCst)
    }
}

impl WebEngine for HeadlessEngine {
    fn create_handle(
        &self,
        tab: TabId,
        generation: u64,
        incognito: bool,
    ) -> Result<Box<dyn EngineHandle>, EngineError> {
        let failing = self.counters.failing_creates.load(Ordering::SeqCst);
        if failing > 0 {
            self.counters
                .failing_creates
                .store(failing - 1, Ordering::SeqCst);
            return Err(EngineError::HandleCreation(format!(
                "headless engine refused handle for tab {tab}"
            )));
        }

        self.counters.live_handles.fetch_add(1, Ordering::SeqCst);
        self.counters.created_handles.fetch_add(1, Ordering::SeqCst);
        log::debug!(
            "Headless handle created for tab {} (generation {}, incognito {})",
            tab,
            generation,
            incognito
        );

        Ok(Box::new(HeadlessHandle {
            tab,
            generation,
            entries: Vec::new(),
            current: 0,
            events: self.events.clone(),
            counters: Arc::clone(&self.counters),
            max_history: self.max_history,
        }))
    }
}

struct HeadlessHandle {
    tab: TabId,
    generation: u64,
    entries: Vec<HistoryEntry>,
    current: usize,
    events: Sender<EngineEvent>,
    counters: Arc<EngineCounters>,
    max_history: usize,
}

impl HeadlessHandle {
    fn emit(&self, kind: EngineEventKind) {
        // The receiver may already be gone during shutdown
        let _ = self.events.send(EngineEvent {
            tab: self.tab,
            generation: self.generation,
            kind,
        });
    }

    fn next_entry_id(&self) -> NavEntryId {
        NavEntryId(self.counters.next_entry.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn resolve(&self, url: &str) -> Result<Url, EngineError> {
        match Url::parse(url) {
            Ok(parsed) => Ok(parsed),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self
                    .entries
                    .get(self.current)
                    .and_then(|e| Url::parse(&e.url).ok())
                    .ok_or_else(|| EngineError::InvalidUrl(url.to_string()))?;
                base.join(url)
                    .map_err(|_| EngineError::InvalidUrl(url.to_string()))
            }
            Err(_) => Err(EngineError::InvalidUrl(url.to_string())),
        }
    }

    fn title_for(url: &Url) -> String {
        match url.host_str() {
            Some(host) if url.path() == "/" => host.to_string(),
            Some(host) => format!("{}{}", host, url.path()),
            None => url.to_string(),
        }
    }
}

impl EngineHandle for HeadlessHandle {
    fn load(&mut self, url: &str) -> Result<(), EngineError> {
        let resolved = match self.resolve(url) {
            Ok(resolved) => resolved,
            Err(e) => {
                // Loads fail asynchronously in real engines
                self.emit(EngineEventKind::LoadFailed {
                    error: e.to_string(),
                });
                return Ok(());
            }
        };

        let mut removed = Vec::new();
        if !self.entries.is_empty() {
            // A new navigation drops the forward list
            removed.extend(self.entries.drain(self.current + 1..).map(|e| e.id));
        }

        let entry = HistoryEntry {
            id: self.next_entry_id(),
            title: Self::title_for(&resolved),
            url: resolved.to_string(),
        };
        self.entries.push(entry.clone());

        if self.entries.len() > self.max_history {
            let overflow = self.entries.len() - self.max_history;
            removed.extend(self.entries.drain(..overflow).map(|e| e.id));
        }
        self.current = self.entries.len() - 1;

        if !removed.is_empty() {
            self.emit(EngineEventKind::HistoryPruned { removed });
        }
        self.emit(EngineEventKind::NavigationCommitted { entry });
        Ok(())
    }

    fn restore(&mut self, request: &RestoreRequest) -> Result<(), EngineError> {
        if request.urls.is_empty() {
            return Err(EngineError::LoadFailed(
                "restore request has no history".to_string(),
            ));
        }

        let entries: Vec<HistoryEntry> = request
            .urls
            .iter()
            .map(|url| HistoryEntry {
                id: self.next_entry_id(),
                title: Url::parse(url)
                    .map(|u| Self::title_for(&u))
                    .unwrap_or_else(|_| url.clone()),
                url: url.clone(),
            })
            .collect();
        let removed: Vec<NavEntryId> = self.entries.iter().map(|e| e.id).collect();
        self.entries = entries;
        self.current = request.current_index.min(self.entries.len() - 1);

        if !removed.is_empty() {
            self.emit(EngineEventKind::HistoryPruned { removed });
        }
        // The restore page confirms through its content script, like a real one
        self.emit(EngineEventKind::ScriptMessage {
            body: r#"{"name":"sessionRestoreHelper","type":"didRestoreSession"}"#.to_string(),
        });
        Ok(())
    }

    fn go_back(&mut self) -> Result<(), EngineError> {
        if self.current == 0 || self.entries.is_empty() {
            return Err(EngineError::NoHistoryEntry);
        }
        self.current -= 1;
        let entry = self.entries[self.current].clone();
        self.emit(EngineEventKind::NavigationCommitted { entry });
        Ok(())
    }

    fn history(&self) -> HistoryList {
        HistoryList {
            entries: self.entries.clone(),
            current_index: self.current,
        }
    }
}

impl Drop for HeadlessHandle {
    fn drop(&mut self) {
        self.counters.live_handles.fetch_sub(1, Ordering::SeqCst);
        log::trace!(
            "Headless handle for tab {} (generation {}) released",
            self.tab,
            self.generation
        );
    }
}
