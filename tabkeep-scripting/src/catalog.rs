//! Embedder-registered content scripts shared by every tab.
//!
//! A [`ContentScriptRouter`] lives and dies with one engine handle, so
//! handlers registered by the embedder are kept here as factories. Each time
//! a tab gets a new handle, [`ScriptCatalog::install`] fills its fresh router
//! with the built-ins followed by one new instance of every catalog entry.

use super::protocol::ScriptName;
use super::router::{ContentScript, ContentScriptRouter, RouterError};
use super::scripts::register_builtin_scripts;

/// Builds a fresh handler instance for one router
pub type ScriptFactory = Box<dyn Fn() -> Box<dyn ContentScript> + Send>;

/// Named handler factories applied to every router a tab creates
#[derive(Default)]
pub struct ScriptCatalog {
    entries: Vec<(ScriptName, ScriptFactory)>,
}

impl ScriptCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler factory under `name`.
    ///
    /// Names already in the catalog, and the built-in handler names, are
    /// rejected; the existing handler stays in place.
    pub fn register(
        &mut self,
        name: impl Into<ScriptName>,
        factory: ScriptFactory,
    ) -> Result<(), RouterError> {
        let name = name.into();
        if !matches!(name, ScriptName::Custom(_)) || self.contains(&name) {
            log::warn!("Rejected duplicate catalog registration of '{}'", name);
            return Err(RouterError::Duplicate(name));
        }
        log::debug!("Added content script '{}' to the catalog", name);
        self.entries.push((name, factory));
        Ok(())
    }

    pub fn contains(&self, name: &ScriptName) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a new instance of the handler registered under `name`
    pub fn instantiate(&self, name: &ScriptName) -> Option<Box<dyn ContentScript>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, factory)| factory())
    }

    /// Register the built-ins and then every catalog entry on `router`.
    ///
    /// Registration errors are logged by the router; the first one is returned.
    pub fn install(&self, router: &mut ContentScriptRouter) -> Result<(), RouterError> {
        let mut first_error = register_builtin_scripts(router).err();
        for (name, factory) in &self.entries {
            if let Err(e) = router.register(name.clone(), factory())
                && first_error.is_none()
            {
                first_error = Some(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ScriptCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.entries.iter().map(|(n, _)| n.wire_name()).collect();
        f.debug_struct("ScriptCatalog").field("entries", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ScriptMessage;
    use crate::router::RouterState;
    use crate::scripts::ScriptEffect;
    use serde_json::Map;

    fn tagged(tag: &'static str) -> ScriptFactory {
        Box::new(move || -> Box<dyn ContentScript> {
            Box::new(move |_: &ScriptMessage| {
                Some(ScriptEffect::Custom {
                    name: tag.to_string(),
                    payload: Map::new(),
                })
            })
        })
    }

    #[test]
    fn test_duplicate_and_builtin_names_are_rejected() {
        let mut catalog = ScriptCatalog::new();
        catalog.register("readerMode", tagged("first")).unwrap();
        assert_eq!(
            catalog.register("readerMode", tagged("second")),
            Err(RouterError::Duplicate(ScriptName::from("readerMode")))
        );
        assert_eq!(
            catalog.register(ScriptName::Prompt, tagged("impostor")),
            Err(RouterError::Duplicate(ScriptName::Prompt))
        );
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_install_gives_each_router_fresh_handlers() {
        let mut catalog = ScriptCatalog::new();
        catalog.register("readerMode", tagged("reader")).unwrap();

        let mut first = ContentScriptRouter::new();
        catalog.install(&mut first).unwrap();
        assert_eq!(first.handler_count(), 5);
        first.unregister_all();

        let mut second = ContentScriptRouter::new();
        catalog.install(&mut second).unwrap();
        assert_eq!(second.state(), RouterState::Attached);
        match second.dispatch_raw(r#"{"name":"readerMode"}"#).into_effect() {
            Some(ScriptEffect::Custom { name, .. }) => assert_eq!(name, "reader"),
            other => panic!("unexpected effect {other:?}"),
        }
    }
}
