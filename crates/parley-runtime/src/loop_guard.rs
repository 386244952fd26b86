//! [`LoopGuard`] – repeated tool-call detector.
//!
//! Within one user turn the engine may call tools several times before it
//! speaks.  A confused engine can keep issuing the very same call (same tool,
//! same arguments) forever; the guard notices and lets the session cut the
//! turn short.
//!
//! Calls are compared by signature: tool name plus the canonical JSON text of
//! the arguments.
//!
//! # Example
//!
//! ```rust
//! use parley_runtime::loop_guard::LoopGuard;
//! use parley_types::ToolCall;
//!
//! let call = ToolCall {
//!     id: "call_1".into(),
//!     name: "recall".into(),
//!     arguments: serde_json::json!({ "count": 3 }),
//! };
//!
//! let mut guard = LoopGuard::new(3);
//! assert!(!guard.record(&call));
//! assert!(!guard.record(&call));
//! assert!(guard.record(&call)); // third identical call
//!
//! guard.reset();
//! assert!(!guard.record(&call));
//! ```

use std::collections::VecDeque;

use parley_types::ToolCall;

/// Flags `threshold` consecutive identical tool calls.
pub struct LoopGuard {
    threshold: usize,
    recent: VecDeque<String>,
}

impl LoopGuard {
    /// A `threshold` of 0 is treated as 1.
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            threshold,
            recent: VecDeque::with_capacity(threshold),
        }
    }

    /// Record `call`; returns `true` once the last `threshold` calls share one
    /// signature.
    pub fn record(&mut self, call: &ToolCall) -> bool {
        self.recent.push_back(signature(call));
        if self.recent.len() > self.threshold {
            self.recent.pop_front();
        }
        self.is_stuck()
    }

    pub fn is_stuck(&self) -> bool {
        self.recent.len() == self.threshold
            && self.recent.iter().all(|s| s == &self.recent[0])
    }

    /// Forget all calls; the session does this at the start of each user turn.
    pub fn reset(&mut self) {
        self.recent.clear();
    }
}

// The call id differs on every call, so it is left out.
fn signature(call: &ToolCall) -> String {
    format!("{}:{}", call.name, call.arguments)
}
