// Library exports for the tab lifecycle core and its CLI.
//
// Threading model: `TabRegistry` and every `TabEntity` are owned by a single
// thread. Engine callbacks are queued on a `std::sync::mpsc` channel and
// applied with `TabRegistry::drain_events`. The only cross-thread state is the
// background session writer, which guards its bookkeeping with
// `parking_lot::Mutex`.

/// Crate version, for display in the CLI and logs.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[macro_use]
pub mod debug;

pub mod archival;
pub mod artifacts;
pub mod cli;
pub mod engine;
pub mod session;
pub mod tab;

pub use archival::{ArchivalSubject, TimeBucket, classify, is_archived};
pub use artifacts::{ArtifactStore, ScreenshotStore};
pub use engine::{EngineError, EngineEvent, EngineEventKind, EngineHandle, HeadlessEngine, WebEngine};
pub use session::{PersistedSession, PersistedTab, RestoreRequest, SessionSnapshot};
pub use tab::{
    HandleState, MemoryPressureLevel, RegistryError, RegistryEvent, TabEntity, TabError, TabId,
    TabRegistry,
};
pub use tabkeep_config::{ArchivalRetention, Config};
