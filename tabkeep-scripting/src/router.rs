//! Per-tab content-script handler registry.
//!
//! [`ContentScriptRouter`] owns the handlers attached to one live engine
//! handle. Its lifetime follows `Unattached → Attached → TornDown`; a torn-down
//! router accepts no further registrations and drops every message, and a
//! rematerialized tab starts over with a fresh router.

use std::collections::HashMap;

use super::protocol::{ScriptMessage, ScriptName};
use super::scripts::ScriptEffect;

/// A native handler for one named content-script message.
pub trait ContentScript: Send {
    /// Handle a message addressed to this script.
    ///
    /// Returns the effect the owning tab should apply, if any.
    fn handle(&mut self, message: &ScriptMessage) -> Option<ScriptEffect>;
}

impl<F> ContentScript for F
where
    F: FnMut(&ScriptMessage) -> Option<ScriptEffect> + Send,
{
    fn handle(&mut self, message: &ScriptMessage) -> Option<ScriptEffect> {
        self(message)
    }
}

/// Lifecycle state of a router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    /// No handler registered yet
    Unattached,
    /// At least one handler registered
    Attached,
    /// `unregister_all` has run; the owning handle is being released
    TornDown,
}

/// Registration failures. Both are logged by the router and returned so the
/// caller can decide whether to care.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    #[error("content script '{0}' is already registered for this tab")]
    Duplicate(ScriptName),
    #[error("cannot register content script '{0}': router has been torn down")]
    TornDown(ScriptName),
}

/// Outcome of dispatching one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// A handler ran and produced an optional effect
    Handled(Option<ScriptEffect>),
    /// No handler is registered under the message's name (or the router is torn down)
    Dropped,
}

impl Dispatch {
    /// The effect produced by the handler, if one ran and returned something
    pub fn into_effect(self) -> Option<ScriptEffect> {
        match self {
            Dispatch::Handled(effect) => effect,
            Dispatch::Dropped => None,
        }
    }
}

/// Registry of named handlers for a single tab's live engine handle.
pub struct ContentScriptRouter {
    state: RouterState,
    handlers: HashMap<ScriptName, Box<dyn ContentScript>>,
}

impl ContentScriptRouter {
    /// Create an empty, unattached router.
    pub fn new() -> Self {
        Self {
            state: RouterState::Unattached,
            handlers: HashMap::new(),
        }
    }

    pub fn state(&self) -> RouterState {
        self.state
    }

    /// Register `handler` under `name`.
    ///
    /// A name that is already taken is rejected and the existing handler stays
    /// in place.
    pub fn register(
        &mut self,
        name: impl Into<ScriptName>,
        handler: Box<dyn ContentScript>,
    ) -> Result<(), RouterError> {
        let name = name.into();
        if self.state == RouterState::TornDown {
            log::warn!("Rejected registration of '{}' after teardown", name);
            return Err(RouterError::TornDown(name));
        }
        if self.handlers.contains_key(&name) {
            log::warn!("Rejected duplicate registration of content script '{}'", name);
            return Err(RouterError::Duplicate(name));
        }
        log::debug!("Registered content script '{}'", name);
        self.handlers.insert(name, handler);
        self.state = RouterState::Attached;
        Ok(())
    }

    /// Route a parsed message to the single handler registered for its name.
    pub fn dispatch(&mut self, message: &ScriptMessage) -> Dispatch {
        if self.state == RouterState::TornDown {
            log::debug!("Dropped '{}' message: router torn down", message.name);
            return Dispatch::Dropped;
        }
        match self.handlers.get_mut(&message.name) {
            Some(handler) => Dispatch::Handled(handler.handle(message)),
            None => {
                log::trace!("No handler for '{}', dropping message", message.name);
                Dispatch::Dropped
            }
        }
    }

    /// Parse a raw envelope and dispatch it. Malformed bodies are dropped.
    pub fn dispatch_raw(&mut self, body: &str) -> Dispatch {
        match ScriptMessage::parse(body) {
            Ok(message) => self.dispatch(&message),
            Err(e) => {
                log::warn!("Dropping content-script message: {}", e);
                Dispatch::Dropped
            }
        }
    }

    /// Drop every handler and move to `TornDown`.
    ///
    /// Returns how many handlers were removed. Calling it again is a no-op.
    pub fn unregister_all(&mut self) -> usize {
        if self.state == RouterState::TornDown {
            return 0;
        }
        let count = self.handlers.len();
        self.handlers.clear();
        self.state = RouterState::TornDown;
        log::debug!("Content-script router torn down ({} handlers)", count);
        count
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for ContentScriptRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContentScriptRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(|n| n.wire_name()).collect();
        names.sort_unstable();
        f.debug_struct("ContentScriptRouter")
            .field("state", &self.state)
            .field("handlers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler(counter: Arc<AtomicUsize>, tag: &'static str) -> Box<dyn ContentScript> {
        Box::new(move |_msg: &ScriptMessage| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(ScriptEffect::Custom {
                name: tag.to_string(),
                payload: Map::new(),
            })
        })
    }

    fn message(name: &str) -> ScriptMessage {
        ScriptMessage::new(name, Map::new())
    }

    #[test]
    fn test_state_transitions() {
        let mut router = ContentScriptRouter::new();
        assert_eq!(router.state(), RouterState::Unattached);

        let counter = Arc::new(AtomicUsize::new(0));
        router
            .register("a", counting_handler(counter.clone(), "a"))
            .unwrap();
        assert_eq!(router.state(), RouterState::Attached);

        assert_eq!(router.unregister_all(), 1);
        assert_eq!(router.state(), RouterState::TornDown);
        assert_eq!(router.unregister_all(), 0);
    }

    #[test]
    fn test_duplicate_registration_keeps_original() {
        let mut router = ContentScriptRouter::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        router
            .register("A", counting_handler(first.clone(), "first"))
            .unwrap();
        let err = router
            .register("A", counting_handler(second.clone(), "second"))
            .unwrap_err();
        assert_eq!(err, RouterError::Duplicate(ScriptName::from("A")));

        let outcome = router.dispatch(&message("A"));
        match outcome.into_effect() {
            Some(ScriptEffect::Custom { name, .. }) => assert_eq!(name, "first"),
            other => panic!("unexpected effect {other:?}"),
        }
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_message_is_dropped() {
        let mut router = ContentScriptRouter::new();
        assert_eq!(router.dispatch(&message("nobody")), Dispatch::Dropped);
        assert_eq!(router.dispatch_raw("{broken"), Dispatch::Dropped);
    }

    #[test]
    fn test_no_registration_or_dispatch_after_teardown() {
        let mut router = ContentScriptRouter::new();
        let counter = Arc::new(AtomicUsize::new(0));
        router
            .register("a", counting_handler(counter.clone(), "a"))
            .unwrap();
        router.unregister_all();

        assert_eq!(
            router.register("b", counting_handler(counter.clone(), "b")),
            Err(RouterError::TornDown(ScriptName::from("b")))
        );
        assert_eq!(router.dispatch(&message("a")), Dispatch::Dropped);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dispatch_raw_routes_by_name() {
        let mut router = ContentScriptRouter::new();
        let counter = Arc::new(AtomicUsize::new(0));
        router
            .register("custom", counting_handler(counter.clone(), "custom"))
            .unwrap();
        assert!(matches!(
            router.dispatch_raw(r#"{"name":"custom","x":1}"#),
            Dispatch::Handled(Some(_))
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
