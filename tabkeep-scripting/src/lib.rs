//! Content-script message routing for tabkeep.
//!
//! Web content posts JSON envelopes of the form `{"name": "<handler>", ...}`
//! through the engine's script-messaging bridge. This crate parses those
//! envelopes, keeps the per-tab table of registered handlers, and turns
//! handled messages into [`ScriptEffect`] values the owning tab applies.

pub mod catalog;
pub mod protocol;
pub mod router;
pub mod scripts;

pub use catalog::{ScriptCatalog, ScriptFactory};
pub use protocol::{ProtocolError, ScriptMessage, ScriptName};
pub use router::{ContentScript, ContentScriptRouter, Dispatch, RouterError, RouterState};
pub use scripts::{PromptKind, PromptRequest, ScriptEffect, register_builtin_scripts};
