//! `parley-memory` – The Record Ledger.
//!
//! Everything a conversation leaves behind: the finalized records, the pure
//! builder that normalizes raw captured fields into them, the append-only JSON
//! store they live in, and the read path that surfaces recent ones again.
//!
//! # Modules
//!
//! - [`record`] – the [`Record`][record::Record] trait and the two record
//!   kinds, [`CoffeeOrder`][record::CoffeeOrder] and
//!   [`WellnessEntry`][record::WellnessEntry], plus their shared
//!   [`Stamp`][record::Stamp].
//! - [`entry`] – Entry Builder: comma-list splitting, the `"none"` sentinel,
//!   summary fallback and time stamping.  No I/O.
//! - [`store`] – [`RecordStore`][store::RecordStore]: a single JSON array file,
//!   read-modify-written per append behind a single-writer lock.
//! - [`recall`] – [`RecallProvider`][recall::RecallProvider]: the trailing
//!   window of records, clamped to [`MAX_RECALL`][recall::MAX_RECALL], and its
//!   bullet digest for the reasoning engine.

pub mod entry;
pub mod recall;
pub mod record;
pub mod store;

pub use entry::{MultiValue, split_multi_value};
pub use recall::{DEFAULT_RECALL, MAX_RECALL, RecallProvider};
pub use record::{CoffeeOrder, Record, Stamp, WellnessEntry};
pub use store::{RecordStore, StoreError};
