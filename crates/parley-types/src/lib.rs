use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Which structured record a session collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    /// A café order: drink, size, milk, extras, name.
    #[default]
    Coffee,
    /// A daily wellness check-in: mood, energy, stressors, objectives, summary.
    Wellness,
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormKind::Coffee => write!(f, "coffee"),
            FormKind::Wellness => write!(f, "wellness"),
        }
    }
}

impl FromStr for FormKind {
    type Err = ParleyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coffee" | "order" => Ok(FormKind::Coffee),
            "wellness" | "checkin" | "check-in" => Ok(FormKind::Wellness),
            other => Err(ParleyError::Config(format!("unknown form kind: {other}"))),
        }
    }
}

/// A callable operation advertised to the reasoning engine.
///
/// `parameters` is a JSON Schema object describing the argument struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    /// Natural-language guidance telling the engine *when* to call the tool.
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    /// Build a spec whose parameter schema is generated from `T`.
    pub fn for_arguments<T: JsonSchema>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let mut parameters =
            serde_json::to_value(schema_for!(T)).unwrap_or(serde_json::Value::Null);
        // Providers reject the draft marker and don't need the Rust type name.
        if let Some(obj) = parameters.as_object_mut() {
            obj.remove("$schema");
            obj.remove("title");
        }
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool invocation requested by the reasoning engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id, echoed back with the result.
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Who produced a line of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Agent,
}

/// One spoken line in a session transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub speaker: Speaker,
    pub text: String,
}

impl Utterance {
    pub fn new(session_id: Uuid, speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            session_id,
            timestamp: Utc::now(),
            speaker,
            text: text.into(),
        }
    }
}

/// Global error type spanning persistence, the reasoning engine, tool
/// arguments and the transport.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParleyError {
    #[error("Record store failure: {0}")]
    Store(String),

    #[error("Reasoning engine failure: {0}")]
    Engine(String),

    #[error("Invalid tool arguments for {tool}: {details}")]
    InvalidArguments { tool: String, details: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
