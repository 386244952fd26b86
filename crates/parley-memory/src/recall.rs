//! Recall Provider.
//!
//! Read-only view over the tail of a [`RecordStore`].  The window is always
//! chronological (oldest of the window first) and never longer than
//! [`MAX_RECALL`], whatever the caller asks for.

use std::sync::Arc;

use crate::record::Record;
use crate::store::RecordStore;

/// Hard ceiling on how many records one recall returns.
pub const MAX_RECALL: usize = 10;

/// Window used when the engine does not name a count.
pub const DEFAULT_RECALL: usize = 3;

/// Text returned instead of an empty digest.
pub const EMPTY_DIGEST: &str = "No previous entries on record.";

/// Clamp an engine-supplied count into `0..=MAX_RECALL`.
pub fn clamp_count(requested: i64) -> usize {
    requested.clamp(0, MAX_RECALL as i64) as usize
}

/// Surfaces the most recent records for conversational continuity.
pub struct RecallProvider<R> {
    store: Arc<RecordStore<R>>,
}

impl<R> Clone for RecallProvider<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<R: Record> RecallProvider<R> {
    pub fn new(store: Arc<RecordStore<R>>) -> Self {
        Self { store }
    }

    /// The trailing `max_count` records (capped at [`MAX_RECALL`]), oldest
    /// first.
    pub fn recent(&self, max_count: usize) -> Vec<R> {
        tail(self.store.load(), max_count)
    }

    /// The single most recent record, if any.
    pub fn latest(&self) -> Option<R> {
        self.store.load().pop()
    }

    /// A bullet list of up to `max_count` recent records for the engine to
    /// quote back to the user.
    ///
    /// [`EMPTY_DIGEST`] only when nothing is on record; a zero count over a
    /// non-empty store says how many entries exist instead.
    pub fn digest(&self, max_count: usize) -> String {
        let all = self.store.load();
        if all.is_empty() {
            return EMPTY_DIGEST.to_string();
        }
        let total = all.len();
        let records = tail(all, max_count);
        if records.is_empty() {
            return format!("No entries requested; {total} on record.");
        }
        records
            .iter()
            .map(|r| format!("- {}", r.digest_line()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn tail<R>(mut all: Vec<R>, max_count: usize) -> Vec<R> {
    let start = all.len().saturating_sub(max_count.min(MAX_RECALL));
    all.split_off(start)
}
