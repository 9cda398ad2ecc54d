//! Shared integration test helpers for tabkeep.
//!
//! Include this module at the top of each test file that needs it:
//!
//! ```ignore
//! mod common;
//! use common::TestContext;
//! ```
//!
//! The `#[allow(dead_code)]` attribute suppresses warnings when only a
//! subset of helpers are used per file.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use tabkeep::engine::HeadlessStats;
use tabkeep::{Config, EngineEvent, HeadlessEngine, TabId, TabRegistry};
use tempfile::TempDir;

/// A registry backed by the headless engine, with its session file in a temp dir.
///
/// The `TempDir` is kept alive for as long as the context is.
pub struct TestContext {
    pub registry: TabRegistry,
    pub events: Receiver<EngineEvent>,
    pub stats: HeadlessStats,
    pub session_path: PathBuf,
    pub temp_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let session_path = temp_dir.path().join("last_session.yaml");
        let (registry, events, stats) = build_registry(config, &session_path);
        Self {
            registry,
            events,
            stats,
            session_path,
            temp_dir,
        }
    }

    /// Simulate a relaunch: a fresh engine and registry over the same session file
    pub fn relaunch(&mut self) {
        let config = self.registry.config().clone();
        let (registry, events, stats) = build_registry(config, &self.session_path);
        self.registry = registry;
        self.events = events;
        self.stats = stats;
    }

    /// Apply every queued engine callback
    pub fn pump(&mut self) -> usize {
        self.registry.drain_events(&self.events)
    }

    /// Open, select, and wait for `url` to commit
    pub fn open_live(&mut self, url: &str) -> TabId {
        let id = self.registry.open(url, None, false);
        self.registry.select(id).expect("select failed");
        self.pump();
        id
    }

    /// Navigate `id` through `urls`, applying each commit
    pub fn navigate_all(&mut self, id: TabId, urls: &[&str]) {
        for url in urls {
            self.registry.navigate(id, url).expect("navigate failed");
            self.pump();
        }
    }
}

fn build_registry(
    config: Config,
    session_path: &PathBuf,
) -> (TabRegistry, Receiver<EngineEvent>, HeadlessStats) {
    let (engine, events) = HeadlessEngine::new(config.max_history_entries);
    let stats = engine.stats();
    let registry = TabRegistry::new(Box::new(engine), config).with_session_path(session_path);
    (registry, events, stats)
}
