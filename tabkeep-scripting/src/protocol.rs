//! JSON envelope types for messages posted by web content.
//!
//! The external contract is string-keyed (`"name"` selects the handler);
//! internally the name is lifted into [`ScriptName`] so the dispatch table is
//! keyed by a closed set of known handlers plus an escape hatch for custom ones.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// Identifies a content-script handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScriptName {
    /// Page title and favicon reports (`metadataMessageHandler`)
    Metadata,
    /// Session-restore confirmation (`sessionRestoreHelper`)
    SessionRestore,
    /// JS alert/confirm/prompt requests (`promptHandler`)
    Prompt,
    /// Find-in-page match counts (`findInPageHandler`)
    FindInPage,
    /// Any other handler name
    Custom(String),
}

impl ScriptName {
    /// The name used on the wire
    pub fn wire_name(&self) -> &str {
        match self {
            ScriptName::Metadata => "metadataMessageHandler",
            ScriptName::SessionRestore => "sessionRestoreHelper",
            ScriptName::Prompt => "promptHandler",
            ScriptName::FindInPage => "findInPageHandler",
            ScriptName::Custom(name) => name,
        }
    }
}

impl From<&str> for ScriptName {
    fn from(name: &str) -> Self {
        match name {
            "metadataMessageHandler" => ScriptName::Metadata,
            "sessionRestoreHelper" => ScriptName::SessionRestore,
            "promptHandler" => ScriptName::Prompt,
            "findInPageHandler" => ScriptName::FindInPage,
            other => ScriptName::Custom(other.to_string()),
        }
    }
}

impl From<String> for ScriptName {
    fn from(name: String) -> Self {
        ScriptName::from(name.as_str())
    }
}

impl fmt::Display for ScriptName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Errors produced while parsing an inbound envelope.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The body was not valid JSON or not an object with a string `name`.
    #[error("malformed script message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The `name` field was present but empty.
    #[error("script message has an empty name")]
    EmptyName,
}

#[derive(Deserialize)]
struct Envelope {
    name: String,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

/// A parsed content-script message: handler name plus remaining payload fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptMessage {
    pub name: ScriptName,
    pub payload: Map<String, Value>,
}

impl ScriptMessage {
    pub fn new(name: impl Into<ScriptName>, payload: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Parse a raw envelope delivered by the engine's messaging bridge.
    pub fn parse(body: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(body)?;
        if envelope.name.is_empty() {
            return Err(ProtocolError::EmptyName);
        }
        Ok(Self {
            name: ScriptName::from(envelope.name),
            payload: envelope.payload,
        })
    }

    /// Deserialize the payload fields into a handler-specific type.
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.payload.clone()))
    }
}
