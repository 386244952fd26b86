//! [`LlmDriver`] – OpenAI-compatible reasoning engine.
//!
//! Talks to any server exposing an OpenAI-compatible `/chat/completions`
//! endpoint with function calling (Groq, OpenAI, a local Ollama, …).  The
//! session sees it only through the [`ReasoningEngine`] trait, so tests swap
//! in a scripted engine.
//!
//! # Example
//!
//! ```rust,no_run
//! use parley_runtime::llm_driver::{ChatMessage, LlmDriver, ReasoningEngine};
//!
//! # async fn demo() -> Result<(), parley_runtime::llm_driver::LlmError> {
//! let driver = LlmDriver::new("https://api.groq.com/openai/v1", "llama-3.3-70b-versatile")
//!     .with_api_key("gsk_...");
//! let history = vec![ChatMessage::user("A medium latte, please.")];
//! // Requires a reachable provider.
//! let _reply = driver.respond("You are a barista.", &[], &history).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use parley_types::{ToolCall, ToolSpec};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

// ─────────────────────────────────────────────────────────────────────────────
// Voice guidelines
// ─────────────────────────────────────────────────────────────────────────────

/// Turn-taking rules appended to every set of instructions.  Replies are
/// spoken aloud, so they have to stay short and plain.
pub const VOICE_GUIDELINES: &str = "\
## Voice Guidelines
- Ask ONE question at a time and wait for the answer.
- Replies are read aloud: no markdown, lists, emojis or code.
- Keep each reply to one or two short sentences.
- Never invent values the user did not say; ask instead.
- Call the save tool only once per conversation.";

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from reasoning-engine calls.
#[derive(Error, Debug)]
pub enum LlmError {
    /// The HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The provider answered with something other than a usable reply.
    #[error("Unexpected response format: {0}")]
    BadResponse(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Message types (OpenAI-compatible)
// ─────────────────────────────────────────────────────────────────────────────

/// The role of a participant in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Function-call shape used on the wire; `arguments` is JSON encoded as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: WireFunction,
}

fn function_kind() -> String {
    "function".to_string()
}

impl From<&ToolCall> for WireToolCall {
    fn from(call: &ToolCall) -> Self {
        // Text kept verbatim on the way in goes back out unquoted.
        let arguments = match &call.arguments {
            serde_json::Value::String(raw) => raw.clone(),
            other => other.to_string(),
        };
        Self {
            id: call.id.clone(),
            kind: function_kind(),
            function: WireFunction {
                name: call.name.clone(),
                arguments,
            },
        }
    }
}

impl From<WireToolCall> for ToolCall {
    fn from(wire: WireToolCall) -> Self {
        // Unparseable argument text is kept verbatim so the controller can
        // report it back to the engine as invalid.
        let arguments = if wire.function.arguments.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(&wire.function.arguments)
                .unwrap_or(serde_json::Value::String(wire.function.arguments))
        };
        ToolCall {
            id: wire.id,
            name: wire.function.name,
            arguments,
        }
    }
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// The assistant turn that requested `calls`; must precede their results.
    pub fn assistant_tool_calls(calls: &[ToolCall]) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls: calls.iter().map(WireToolCall::from).collect(),
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// What the engine decided to do with its turn.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineReply {
    /// Text to speak to the user.
    Speak(String),
    /// Tools to invoke before the engine speaks again.
    ToolCalls(Vec<ToolCall>),
}

// ─────────────────────────────────────────────────────────────────────────────
// ReasoningEngine
// ─────────────────────────────────────────────────────────────────────────────

/// The external turn controller.
///
/// Receives the session instructions, the tool schemas and the turn history,
/// and produces either speech or tool invocations.  How it reasons is opaque.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn respond(
        &self,
        instructions: &str,
        tools: &[ToolSpec],
        history: &[ChatMessage],
    ) -> Result<EngineReply, LlmError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal request / response shapes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolSpec,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    stream: bool,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Prepend the system message (instructions plus [`VOICE_GUIDELINES`]) to the
/// turn history.
pub fn build_messages(instructions: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::system(format!(
        "{instructions}\n\n{VOICE_GUIDELINES}"
    )));
    messages.extend(history.iter().filter(|m| m.role != Role::System).cloned());
    messages
}

fn reply_from(message: ChatMessage) -> Result<EngineReply, LlmError> {
    if !message.tool_calls.is_empty() {
        return Ok(EngineReply::ToolCalls(
            message.tool_calls.into_iter().map(ToolCall::from).collect(),
        ));
    }
    match message.content {
        Some(text) if !text.trim().is_empty() => Ok(EngineReply::Speak(text.trim().to_string())),
        _ => Err(LlmError::BadResponse(
            "assistant message had neither text nor tool calls".into(),
        )),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LlmDriver
// ─────────────────────────────────────────────────────────────────────────────

/// An async client for an OpenAI-compatible chat-completions endpoint.
///
/// Construct once per process and share across sessions.
pub struct LlmDriver {
    base_url: String,
    model: String,
    api_key: Option<Zeroizing<String>>,
    temperature: f32,
    client: reqwest::Client,
}

impl LlmDriver {
    /// Create a driver for `base_url` (e.g. `"https://api.groq.com/openai/v1"`,
    /// `"http://localhost:11434/v1"`) and `model`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            temperature: 0.6,
            client: reqwest::Client::new(),
        }
    }

    /// Send `Authorization: Bearer <key>` with every request.  An empty key is
    /// ignored.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.api_key = (!key.is_empty()).then(|| Zeroizing::new(key));
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ReasoningEngine for LlmDriver {
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the request fails or the provider answers
    /// with an error status, or [`LlmError::BadResponse`] if the reply has no
    /// choices or an empty message.
    async fn respond(
        &self,
        instructions: &str,
        tools: &[ToolSpec],
        history: &[ChatMessage],
    ) -> Result<EngineReply, LlmError> {
        let messages = build_messages(instructions, history);
        let body = ChatRequest {
            model: &self.model,
            messages: &messages,
            tools: tools
                .iter()
                .map(|t| WireTool {
                    kind: "function",
                    function: t,
                })
                .collect(),
            tool_choice: (!tools.is_empty()).then_some("auto"),
            stream: false,
            temperature: self.temperature,
        };

        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.as_str());
        }

        let response: ChatResponse = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| LlmError::BadResponse("empty choices array".into()))?;
        reply_from(message)
    }
}
