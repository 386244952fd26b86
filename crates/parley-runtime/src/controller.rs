//! [`DialogueController`] – per-session state capture.
//!
//! Holds one session's in-progress draft and exposes two tools to the
//! reasoning engine:
//!
//! | tool | effect |
//! |---|---|
//! | capture (`save_order` / `save_checkin`) | build the record, append it to the store, finish the session's form |
//! | `recall` | bullet digest of up to `count` recent records (default 3, max 10) |
//!
//! # Phases
//!
//! The engine is *instructed* to walk the form's steps in order
//! ([`Form::instructed_steps`]) and confirm before saving, but the controller
//! does not police that.  The only mechanical transition is
//! [`DialoguePhase::Collecting`] → [`DialoguePhase::Complete`], taken by the
//! first successful capture.  Whether the user really confirmed the values
//! first is outside what this component can observe.
//!
//! Capture is idempotent per session: once complete, further capture calls
//! persist nothing and answer with the already-saved confirmation.

use std::sync::Arc;

use parley_memory::recall::{DEFAULT_RECALL, MAX_RECALL, clamp_count};
use parley_memory::{RecallProvider, RecordStore};
use parley_types::{ParleyError, ToolCall, ToolSpec};
use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::form::Form;

/// Name of the on-demand history tool.
pub const RECALL_TOOL: &str = "recall";

/// Arguments of the `recall` tool.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct RecallArgs {
    /// How many recent entries to look up (default 3, at most 10).
    #[serde(default)]
    pub count: Option<i64>,
}

/// Where a session stands with respect to its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialoguePhase {
    /// Fields are being gathered conversationally; nothing persisted yet.
    Collecting,
    /// The record has been saved.  Terminal.
    Complete,
}

/// Owns one session's draft and turns tool calls into persisted records.
pub struct DialogueController<F: Form> {
    store: Arc<RecordStore<F>>,
    recall: RecallProvider<F>,
    draft: F::Draft,
    saved: Option<F>,
    recall_window: usize,
}

impl<F: Form> DialogueController<F> {
    pub fn new(store: Arc<RecordStore<F>>) -> Self {
        Self {
            recall: RecallProvider::new(Arc::clone(&store)),
            store,
            draft: F::Draft::default(),
            saved: None,
            recall_window: DEFAULT_RECALL,
        }
    }

    /// Count used when `recall` is called without one (capped at
    /// [`MAX_RECALL`]).
    pub fn with_recall_window(mut self, window: usize) -> Self {
        self.recall_window = window.min(MAX_RECALL);
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn phase(&self) -> DialoguePhase {
        if self.saved.is_some() {
            DialoguePhase::Complete
        } else {
            DialoguePhase::Collecting
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase() == DialoguePhase::Complete
    }

    pub fn draft(&self) -> &F::Draft {
        &self.draft
    }

    /// The record persisted by this session, once complete.
    pub fn saved(&self) -> Option<&F> {
        self.saved.as_ref()
    }

    pub fn recall_provider(&self) -> &RecallProvider<F> {
        &self.recall
    }

    /// Schemas of the tools this controller answers to.
    pub fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::for_arguments::<F::Args>(F::CAPTURE_TOOL, F::capture_description()),
            ToolSpec::for_arguments::<RecallArgs>(
                RECALL_TOOL,
                "Look up the user's most recent previous entries. Use this when they ask \
                 what they had or said last time. Returns short text you can read back.",
            ),
        ]
    }

    // -------------------------------------------------------------------------
    // Tools
    // -------------------------------------------------------------------------

    /// Persist the record described by `args` and return the confirmation to
    /// speak.
    ///
    /// # Errors
    ///
    /// Returns [`ParleyError::Store`] if the append fails.  The session stays
    /// in [`DialoguePhase::Collecting`] so the engine can apologise and try
    /// again.
    #[instrument(name = "capture", skip_all, fields(form = %F::KIND))]
    pub fn capture(&mut self, args: &F::Args) -> Result<String, ParleyError> {
        if let Some(saved) = &self.saved {
            warn!(tool = F::CAPTURE_TOOL, record = %saved.label(), "capture repeated after completion; not persisting again");
            return Ok(format!(
                "{} (This was already saved earlier in the conversation, so nothing new was recorded.)",
                saved.confirmation()
            ));
        }

        let record = F::build(args);
        let total = self.store.append(&record)?;
        info!(form = %F::KIND, total, record = %record.label(), "form captured");

        self.draft = record.draft_of();
        let confirmation = record.confirmation();
        self.saved = Some(record);
        Ok(confirmation)
    }

    /// Digest of up to `count` recent records; `None` means the recall
    /// window ([`DEFAULT_RECALL`] unless configured), anything above the
    /// ceiling is clamped.
    pub fn recall(&self, count: Option<i64>) -> String {
        let count = count.map(clamp_count).unwrap_or(self.recall_window);
        self.recall.digest(count)
    }

    /// Route a tool call from the engine.
    ///
    /// # Errors
    ///
    /// [`ParleyError::UnknownTool`] for an unrecognised name,
    /// [`ParleyError::InvalidArguments`] when the arguments do not fit the
    /// tool's schema, and whatever [`capture`][Self::capture] returns.
    pub fn dispatch(&mut self, call: &ToolCall) -> Result<String, ParleyError> {
        debug!(tool = %call.name, id = %call.id, arguments = %call.arguments, "tool call");
        match call.name.as_str() {
            name if name == F::CAPTURE_TOOL => {
                let args: F::Args = parse_arguments(call)?;
                self.capture(&args)
            }
            RECALL_TOOL => {
                let args: RecallArgs = parse_arguments(call)?;
                Ok(self.recall(args.count))
            }
            other => Err(ParleyError::UnknownTool(other.to_string())),
        }
    }
}

fn parse_arguments<T: DeserializeOwned>(call: &ToolCall) -> Result<T, ParleyError> {
    let value = if call.arguments.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        call.arguments.clone()
    };
    serde_json::from_value(value).map_err(|e| ParleyError::InvalidArguments {
        tool: call.name.clone(),
        details: e.to_string(),
    })
}

/// Tool-result text handed back to the engine when a call fails.
pub fn tool_error_text(err: &ParleyError) -> String {
    match err {
        ParleyError::Store(_) => format!(
            "ERROR: the entry could not be saved ({err}). Nothing was recorded. \
             Apologise to the user and offer to try again."
        ),
        ParleyError::InvalidArguments { .. } => format!(
            "ERROR: {err}. Check the values with the user and call the tool again."
        ),
        _ => format!("ERROR: {err}."),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
