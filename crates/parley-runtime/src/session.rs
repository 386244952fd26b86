//! Session Bootstrap.
//!
//! One [`Session`] per connection.  It wires a [`DialogueController`] to the
//! two external collaborators, the [`ReasoningEngine`] that decides what to
//! say or which tool to call, and the [`VoiceTransport`] that delivers the
//! user's recognised speech and plays back replies, and then runs the turn
//! loop until the user hangs up.
//!
//! # Turn loop
//!
//! 1. The transport yields the user's next utterance (or `None` on hang-up).
//! 2. The utterance is appended to the history and the engine is asked for a
//!    reply.
//! 3. Tool calls are dispatched to the controller one by one and their results
//!    appended as tool messages; the engine is asked again.  At most
//!    [`SessionConfig::max_tool_rounds`] such rounds run per user turn, and the
//!    [`LoopGuard`] cuts the turn short if the engine repeats one call.
//! 4. Text replies are spoken through the transport.
//!
//! Everything is sequential: a tool call finishes before the next turn is
//! processed.
//!
//! # Continuity
//!
//! The most recent stored record is read once, when the session is built, and
//! folded into the instructions.  It is not refreshed mid-session; the engine
//! uses the `recall` tool for anything more.

use std::sync::Arc;

use async_trait::async_trait;
use parley_memory::{DEFAULT_RECALL, RecordStore};
use parley_types::{ParleyError, Speaker, ToolSpec, Utterance};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::controller::{DialogueController, tool_error_text};
use crate::form::{Form, instructions};
use crate::llm_driver::{ChatMessage, EngineReply, ReasoningEngine};
use crate::loop_guard::LoopGuard;

/// Spoken when the engine cannot be reached or answers nonsense.
pub const ENGINE_APOLOGY: &str = "Sorry, I didn't catch that. Could you say it again?";

/// Spoken when a turn is cut short by the tool-round cap or the loop guard.
pub const STUCK_APOLOGY: &str = "Sorry, I got a bit mixed up there. Let's try that again.";

/// The audio side of a session, reduced to text.
#[async_trait]
pub trait VoiceTransport: Send {
    /// Next recognised user utterance; `None` once the user has left.
    async fn next_utterance(&mut self) -> Result<Option<String>, ParleyError>;

    /// Say `text` to the user.
    async fn speak(&mut self, text: &str) -> Result<(), ParleyError>;
}

/// Per-session tuning.  The form itself is the session's type parameter.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Entries the `recall` tool returns when the engine gives no count.
    pub recall_window: usize,
    /// Engine tool rounds allowed within one user turn.
    pub max_tool_rounds: usize,
    /// Identical consecutive tool calls that abort a turn.
    pub loop_guard_threshold: usize,
    /// Stop listening once the record is saved and the closing line spoken.
    pub end_on_complete: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recall_window: DEFAULT_RECALL,
            max_tool_rounds: 4,
            loop_guard_threshold: 3,
            end_on_complete: false,
        }
    }
}

/// What a finished session leaves behind.
#[derive(Debug, Clone)]
pub struct SessionSummary<F> {
    pub session_id: Uuid,
    /// User turns processed.
    pub turns: usize,
    /// The record this session persisted, if it got that far.
    pub saved: Option<F>,
    pub transcript: Vec<Utterance>,
}

/// One conversation, from greeting to hang-up.
pub struct Session<F: Form, T: VoiceTransport> {
    id: Uuid,
    config: SessionConfig,
    instructions: String,
    tools: Vec<ToolSpec>,
    controller: DialogueController<F>,
    engine: Arc<dyn ReasoningEngine>,
    transport: T,
    history: Vec<ChatMessage>,
    guard: LoopGuard,
    transcript: Vec<Utterance>,
    turns: usize,
}

impl<F: Form, T: VoiceTransport> Session<F, T> {
    /// Build a session over a shared store.  Takes the continuity snapshot.
    pub fn new(
        config: SessionConfig,
        store: Arc<RecordStore<F>>,
        engine: Arc<dyn ReasoningEngine>,
        transport: T,
    ) -> Self {
        let controller = DialogueController::new(store).with_recall_window(config.recall_window);
        let previous = controller.recall_provider().latest();
        let instructions = instructions::<F>(previous.as_ref());
        let tools = controller.tools();
        let guard = LoopGuard::new(config.loop_guard_threshold);
        Self {
            id: Uuid::new_v4(),
            config,
            instructions,
            tools,
            controller,
            engine,
            transport,
            history: Vec::new(),
            guard,
            transcript: Vec::new(),
            turns: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn controller(&self) -> &DialogueController<F> {
        &self.controller
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Run the conversation until the transport reports hang-up (or, with
    /// [`SessionConfig::end_on_complete`], until the record is saved).
    ///
    /// # Errors
    ///
    /// Only transport failures end a session early.  Engine and tool failures
    /// are spoken about and the conversation carries on.
    #[instrument(name = "session", skip_all, fields(session = %self.id, form = %F::KIND))]
    pub async fn run(mut self) -> Result<SessionSummary<F>, ParleyError> {
        info!(session = %self.id, form = %F::KIND, "session started");
        self.say(F::greeting()).await?;

        while let Some(raw) = self.transport.next_utterance().await? {
            let text = raw.trim();
            if text.is_empty() {
                continue;
            }
            self.turns += 1;
            self.transcript
                .push(Utterance::new(self.id, Speaker::User, text));
            self.history.push(ChatMessage::user(text));

            self.take_turn().await?;

            if self.config.end_on_complete && self.controller.is_complete() {
                break;
            }
        }

        let saved = self.controller.saved().cloned();
        info!(
            session = %self.id,
            turns = self.turns,
            saved = saved.is_some(),
            "session ended"
        );
        Ok(SessionSummary {
            session_id: self.id,
            turns: self.turns,
            saved,
            transcript: self.transcript,
        })
    }

    #[instrument(name = "turn", skip_all, fields(turn = self.turns))]
    async fn take_turn(&mut self) -> Result<(), ParleyError> {
        self.guard.reset();
        let complete_before = self.controller.is_complete();

        for round in 0..=self.config.max_tool_rounds {
            let reply = match self
                .engine
                .respond(&self.instructions, &self.tools, &self.history)
                .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(session = %self.id, error = %e, "reasoning engine failed");
                    return self.say(ENGINE_APOLOGY).await;
                }
            };

            let calls = match reply {
                EngineReply::Speak(text) => return self.say(&text).await,
                EngineReply::ToolCalls(calls) => calls,
            };
            if round == self.config.max_tool_rounds {
                warn!(session = %self.id, rounds = round, "tool round limit reached");
                break;
            }

            self.history.push(ChatMessage::assistant_tool_calls(&calls));
            let mut stuck = false;
            for call in &calls {
                stuck |= self.guard.record(call);
                let content = match self.controller.dispatch(call) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(session = %self.id, tool = %call.name, error = %e, "tool call failed");
                        tool_error_text(&e)
                    }
                };
                self.history.push(ChatMessage::tool_result(&call.id, content));
            }
            if stuck {
                warn!(session = %self.id, "loop guard tripped: engine repeated the same tool call");
                break;
            }
        }

        // A record saved during this turn is confirmed rather than apologised for.
        let closing = match self.controller.saved() {
            Some(record) if !complete_before => record.confirmation(),
            _ => STUCK_APOLOGY.to_string(),
        };
        self.say(&closing).await
    }

    async fn say(&mut self, text: &str) -> Result<(), ParleyError> {
        self.history.push(ChatMessage::assistant(text));
        self.transcript
            .push(Utterance::new(self.id, Speaker::Agent, text));
        self.transport.speak(text).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
