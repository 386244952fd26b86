//! # parley-runtime
//!
//! Conversation runtime for Parley voice agents.
//!
//! | Module | Responsibility |
//! |---|---|
//! | [`form`] | The [`Form`] trait: per-form persona, steps, capture tool and confirmation. |
//! | [`controller`] | [`DialogueController`]: tool dispatch, idempotent capture, recall. |
//! | [`llm_driver`] | [`ReasoningEngine`] seam and the OpenAI-compatible [`LlmDriver`]. |
//! | [`loop_guard`] | [`LoopGuard`]: stops an engine stuck repeating one tool call. |
//! | [`session`] | [`Session`]: the turn loop over a [`VoiceTransport`]. |
//! | [`telemetry`] | Tracing subscriber and optional OTLP export. |
//!
//! A session is assembled from a shared [`parley_memory::RecordStore`], an
//! engine and a transport:
//!
//! ```rust,no_run
//! # async fn demo(transport: impl parley_runtime::VoiceTransport) -> Result<(), parley_types::ParleyError> {
//! use std::sync::Arc;
//! use parley_memory::{CoffeeOrder, RecordStore};
//! use parley_runtime::{LlmDriver, Session, SessionConfig};
//!
//! let store = Arc::new(RecordStore::<CoffeeOrder>::open("orders.json"));
//! let engine = Arc::new(
//!     LlmDriver::new("https://api.groq.com/openai/v1", "llama-3.3-70b-versatile")
//!         .with_api_key("gsk_..."),
//! );
//! let summary = Session::new(SessionConfig::default(), store, engine, transport)
//!     .run()
//!     .await?;
//! println!("saved: {:?}", summary.saved);
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod form;
pub mod llm_driver;
pub mod loop_guard;
pub mod session;
pub mod telemetry;

pub use controller::{DialogueController, DialoguePhase, RECALL_TOOL, RecallArgs, tool_error_text};
pub use form::{CoffeeOrderArgs, CoffeeOrderDraft, Form, WellnessArgs, WellnessDraft, instructions};
pub use llm_driver::{ChatMessage, EngineReply, LlmDriver, LlmError, ReasoningEngine, Role};
pub use loop_guard::LoopGuard;
pub use session::{Session, SessionConfig, SessionSummary, VoiceTransport};
