//! Built-in content scripts and the effects they hand back to the tab.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::protocol::{ScriptMessage, ScriptName};
use super::router::{ContentScript, ContentScriptRouter, RouterError};

/// A state change requested by a content script, applied by the owning tab.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptEffect {
    /// The page reported a new title and/or favicon
    MetadataChanged {
        title: Option<String>,
        favicon: Option<String>,
    },
    /// The restore page finished rebuilding the back/forward list
    SessionRestored,
    /// The page wants to show an alert, confirm, or prompt dialog
    PromptRequested(PromptRequest),
    /// Find-in-page match counts changed
    FindResults { current: u32, total: u32 },
    /// Message for an embedder-defined handler, forwarded untouched
    Custom {
        name: String,
        payload: Map<String, Value>,
    },
}

/// Kind of in-page dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Alert,
    Confirm,
    Prompt,
}

/// An in-page dialog request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRequest {
    pub kind: PromptKind,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub default_text: Option<String>,
}

#[derive(Deserialize)]
struct MetadataPayload {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    icon: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindPayload {
    current_result: u32,
    total_results: u32,
}

/// Reports `document.title` and the best favicon candidate.
struct MetadataScript;

impl ContentScript for MetadataScript {
    fn handle(&mut self, message: &ScriptMessage) -> Option<ScriptEffect> {
        match message.payload_as::<MetadataPayload>() {
            Ok(payload) if payload.title.is_some() || payload.icon.is_some() => {
                Some(ScriptEffect::MetadataChanged {
                    title: payload.title,
                    favicon: payload.icon,
                })
            }
            Ok(_) => None,
            Err(e) => {
                log::warn!("Invalid metadata payload: {}", e);
                None
            }
        }
    }
}

/// Confirms that the restore pseudo-URL has rebuilt the history list.
struct SessionRestoreScript;

impl ContentScript for SessionRestoreScript {
    fn handle(&mut self, message: &ScriptMessage) -> Option<ScriptEffect> {
        match message.payload.get("type").and_then(Value::as_str) {
            Some("didRestoreSession") => Some(ScriptEffect::SessionRestored),
            other => {
                log::debug!("Ignoring session restore message type {:?}", other);
                None
            }
        }
    }
}

/// Turns `alert`/`confirm`/`prompt` calls into queued prompt requests.
struct PromptScript;

impl ContentScript for PromptScript {
    fn handle(&mut self, message: &ScriptMessage) -> Option<ScriptEffect> {
        match message.payload_as::<PromptRequest>() {
            Ok(request) => Some(ScriptEffect::PromptRequested(request)),
            Err(e) => {
                log::warn!("Invalid prompt payload: {}", e);
                None
            }
        }
    }
}

struct FindInPageScript;

impl ContentScript for FindInPageScript {
    fn handle(&mut self, message: &ScriptMessage) -> Option<ScriptEffect> {
        let payload = message.payload_as::<FindPayload>().ok()?;
        Some(ScriptEffect::FindResults {
            current: payload.current_result,
            total: payload.total_results,
        })
    }
}

/// Register the handlers every live tab carries.
pub fn register_builtin_scripts(router: &mut ContentScriptRouter) -> Result<(), RouterError> {
    router.register(ScriptName::Metadata, Box::new(MetadataScript))?;
    router.register(ScriptName::SessionRestore, Box::new(SessionRestoreScript))?;
    router.register(ScriptName::Prompt, Box::new(PromptScript))?;
    router.register(ScriptName::FindInPage, Box::new(FindInPageScript))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> ContentScriptRouter {
        let mut router = ContentScriptRouter::new();
        register_builtin_scripts(&mut router).unwrap();
        router
    }

    #[test]
    fn test_builtins_register_once() {
        let mut router = router();
        assert_eq!(router.handler_count(), 4);
        assert!(register_builtin_scripts(&mut router).is_err());
        assert_eq!(router.handler_count(), 4);
    }

    #[test]
    fn test_metadata_message() {
        let effect = router()
            .dispatch_raw(
                r#"{"name":"metadataMessageHandler","title":"Example","icon":"https://example.com/favicon.ico"}"#,
            )
            .into_effect();
        assert_eq!(
            effect,
            Some(ScriptEffect::MetadataChanged {
                title: Some("Example".to_string()),
                favicon: Some("https://example.com/favicon.ico".to_string()),
            })
        );
    }

    #[test]
    fn test_session_restore_message() {
        let mut router = router();
        assert_eq!(
            router
                .dispatch_raw(r#"{"name":"sessionRestoreHelper","type":"didRestoreSession"}"#)
                .into_effect(),
            Some(ScriptEffect::SessionRestored)
        );
        assert_eq!(
            router
                .dispatch_raw(r#"{"name":"sessionRestoreHelper","type":"somethingElse"}"#)
                .into_effect(),
            None
        );
    }

    #[test]
    fn test_prompt_message() {
        let effect = router()
            .dispatch_raw(
                r#"{"name":"promptHandler","kind":"prompt","message":"Name?","defaultText":"Ann"}"#,
            )
            .into_effect();
        assert_eq!(
            effect,
            Some(ScriptEffect::PromptRequested(PromptRequest {
                kind: PromptKind::Prompt,
                message: "Name?".to_string(),
                default_text: Some("Ann".to_string()),
            }))
        );
    }

    #[test]
    fn test_find_message_with_bad_payload_is_ignored() {
        let mut router = router();
        assert_eq!(
            router
                .dispatch_raw(r#"{"name":"findInPageHandler","currentResult":2,"totalResults":9}"#)
                .into_effect(),
            Some(ScriptEffect::FindResults { current: 2, total: 9 })
        );
        assert_eq!(
            router
                .dispatch_raw(r#"{"name":"findInPageHandler","currentResult":"x"}"#)
                .into_effect(),
            None
        );
    }
}
