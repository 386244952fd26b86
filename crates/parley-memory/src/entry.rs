//! Entry Builder.
//!
//! Turns the raw fields a capture tool receives into a normalized
//! [`Record`][crate::record::Record].  Everything here is pure apart from the
//! clock read in the non-`_at` wrappers, so tests pin the instant explicitly.
//!
//! # Normalization rules
//!
//! - Multi-value fields are split on `,`, each piece trimmed, empty pieces
//!   dropped.  The sentinel `none` (any case) means "nothing" and never ends up
//!   as an element.
//! - Scalar fields are trimmed.
//! - A wellness `summary` that is missing or blank falls back to
//!   `"mood: X, energy: Y"`; an explicit summary is never overwritten.
//! - Timestamp, date and time come from one instant.
//!
//! # Example
//!
//! ```rust
//! use parley_memory::entry::split_multi_value;
//!
//! assert_eq!(split_multi_value("sugar, caramel ,  "), vec!["sugar", "caramel"]);
//! assert!(split_multi_value("None").is_empty());
//! ```

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::record::{CoffeeOrder, Stamp, WellnessEntry};

/// Sentinel a user (or the engine) gives for "no extras" / "no objectives".
const NONE_SENTINEL: &str = "none";

fn is_none_sentinel(piece: &str) -> bool {
    piece.eq_ignore_ascii_case(NONE_SENTINEL)
}

/// Split a comma-joined field into its trimmed, non-empty pieces.
pub fn split_multi_value(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty() && !is_none_sentinel(piece))
        .map(str::to_string)
        .collect()
}

/// A multi-value tool argument.
///
/// Engines with good tool support send a JSON array; others send a single
/// comma-joined string.  Both normalize identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum MultiValue {
    List(Vec<String>),
    Joined(String),
}

impl Default for MultiValue {
    fn default() -> Self {
        MultiValue::List(Vec::new())
    }
}

impl MultiValue {
    pub fn normalize(&self) -> Vec<String> {
        match self {
            MultiValue::Joined(raw) => split_multi_value(raw),
            MultiValue::List(items) => items
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty() && !is_none_sentinel(item))
                .map(str::to_string)
                .collect(),
        }
    }
}

impl From<&str> for MultiValue {
    fn from(raw: &str) -> Self {
        MultiValue::Joined(raw.to_string())
    }
}

impl From<Vec<String>> for MultiValue {
    fn from(items: Vec<String>) -> Self {
        MultiValue::List(items)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builders
// ─────────────────────────────────────────────────────────────────────────────

/// Build a [`CoffeeOrder`] stamped with the current instant.
pub fn build_coffee_order(
    drink_type: &str,
    size: &str,
    milk: &str,
    extras: &MultiValue,
    name: &str,
) -> CoffeeOrder {
    build_coffee_order_at(drink_type, size, milk, extras, name, Utc::now())
}

pub fn build_coffee_order_at(
    drink_type: &str,
    size: &str,
    milk: &str,
    extras: &MultiValue,
    name: &str,
    now: DateTime<Utc>,
) -> CoffeeOrder {
    CoffeeOrder {
        drink_type: drink_type.trim().to_string(),
        size: size.trim().to_string(),
        milk: milk.trim().to_string(),
        extras: extras.normalize(),
        name: name.trim().to_string(),
        stamp: Stamp::at(now),
    }
}

/// Build a [`WellnessEntry`] stamped with the current instant.
pub fn build_wellness_entry(
    mood: &str,
    energy: &str,
    objectives: &MultiValue,
    stressors: Option<&str>,
    summary: Option<&str>,
) -> WellnessEntry {
    build_wellness_entry_at(mood, energy, objectives, stressors, summary, Utc::now())
}

pub fn build_wellness_entry_at(
    mood: &str,
    energy: &str,
    objectives: &MultiValue,
    stressors: Option<&str>,
    summary: Option<&str>,
    now: DateTime<Utc>,
) -> WellnessEntry {
    let mood = mood.trim().to_string();
    let energy = energy.trim().to_string();
    let summary = match summary.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => format!("mood: {mood}, energy: {energy}"),
    };
    WellnessEntry {
        stressors: stressors.map(str::trim).unwrap_or_default().to_string(),
        objectives: objectives.normalize(),
        summary,
        mood,
        energy,
        stamp: Stamp::at(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 17, 4, 9).unwrap()
    }

    // ── split_multi_value ─────────────────────────────────────────────────────

    #[test]
    fn split_trims_and_drops_empty_pieces() {
        assert_eq!(split_multi_value("sugar, caramel ,  "), vec!["sugar", "caramel"]);
    }

    #[test]
    fn none_sentinel_in_any_case_is_empty() {
        for raw in ["none", "None", "NONE", "  nOnE  "] {
            assert!(split_multi_value(raw).is_empty(), "{raw:?} should be empty");
        }
    }

    #[test]
    fn empty_string_is_empty() {
        assert!(split_multi_value("").is_empty());
        assert!(split_multi_value(" , ,").is_empty());
    }

    #[test]
    fn order_of_pieces_is_preserved() {
        assert_eq!(
            split_multi_value("whipped cream,chocolate,sugar"),
            vec!["whipped cream", "chocolate", "sugar"]
        );
    }

    // ── MultiValue ────────────────────────────────────────────────────────────

    #[test]
    fn multi_value_accepts_array_or_string() {
        let list: MultiValue = serde_json::from_str(r#"["caramel", " sugar "]"#).unwrap();
        let joined: MultiValue = serde_json::from_str(r#""caramel, sugar""#).unwrap();
        assert_eq!(list.normalize(), joined.normalize());
    }

    #[test]
    fn multi_value_list_drops_sentinel_and_blanks() {
        let list = MultiValue::from(vec!["None".to_string(), " ".to_string()]);
        assert!(list.normalize().is_empty());
    }

    // ── builders ──────────────────────────────────────────────────────────────

    #[test]
    fn coffee_order_fields_are_normalized() {
        let order = build_coffee_order_at(
            " latte ",
            "medium",
            "oat",
            &"caramel, sugar".into(),
            "Maya ",
            fixed_now(),
        );
        assert_eq!(order.drink_type, "latte");
        assert_eq!(order.name, "Maya");
        assert_eq!(order.extras, vec!["caramel", "sugar"]);
        assert_eq!(order.stamp.timestamp, fixed_now());
        assert_eq!(order.stamp.date, "2024-03-05");
        assert_eq!(order.stamp.time, "17:04:09");
    }

    #[test]
    fn coffee_order_with_no_extras() {
        let order = build_coffee_order_at("espresso", "small", "none", &"none".into(), "Sam", fixed_now());
        assert!(order.extras.is_empty());
        // Only the multi-value field knows about the sentinel.
        assert_eq!(order.milk, "none");
    }

    #[test]
    fn wellness_summary_falls_back_to_mood_and_energy() {
        let entry = build_wellness_entry_at("calm", "medium", &"walk".into(), None, None, fixed_now());
        assert_eq!(entry.summary, "mood: calm, energy: medium");
        assert_eq!(entry.stressors, "");
    }

    #[test]
    fn wellness_blank_summary_also_falls_back() {
        let entry = build_wellness_entry_at("ok", "low", &"".into(), None, Some("   "), fixed_now());
        assert_eq!(entry.summary, "mood: ok, energy: low");
    }

    #[test]
    fn explicit_wellness_summary_is_kept() {
        let entry = build_wellness_entry_at(
            "anxious",
            "low",
            &"finish slides, call mom".into(),
            Some("presentation"),
            Some("Nervous about the talk but has a plan."),
            fixed_now(),
        );
        assert_eq!(entry.summary, "Nervous about the talk but has a plan.");
        assert_eq!(entry.stressors, "presentation");
        assert_eq!(entry.objectives, vec!["finish slides", "call mom"]);
    }

    #[test]
    fn clock_wrapper_produces_consistent_stamp() {
        let order = build_coffee_order("latte", "large", "whole", &MultiValue::default(), "Ana");
        assert!(order.stamp.is_consistent());
    }
}
