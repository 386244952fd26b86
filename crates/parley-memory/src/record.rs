//! Finalized records.
//!
//! A record is written once at the end of a conversation and never touched
//! again.  Field names on disk are camelCase (`drinkType`, `timestamp`, …) so
//! the container stays readable by hand.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Behaviour shared by every record kind the store can hold.
pub trait Record:
    Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync + 'static
{
    fn stamp(&self) -> &Stamp;

    /// Short identifying text used in log lines.
    fn label(&self) -> String;

    /// One line of the recall digest, without the bullet marker.
    fn digest_line(&self) -> String;
}

// ─────────────────────────────────────────────────────────────────────────────
// Stamp
// ─────────────────────────────────────────────────────────────────────────────

/// Creation instant plus its date and time-of-day views.
///
/// `date` and `time` are always derived from `timestamp`; construct through
/// [`Stamp::at`] or [`Stamp::now`] to keep them in agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    pub timestamp: DateTime<Utc>,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM:SS`
    pub time: String,
}

impl Stamp {
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            timestamp: instant,
            date: instant.format("%Y-%m-%d").to_string(),
            time: instant.format("%H:%M:%S").to_string(),
        }
    }

    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// `true` when `date` and `time` still match `timestamp`.
    pub fn is_consistent(&self) -> bool {
        *self == Self::at(self.timestamp)
    }

    fn short(&self) -> String {
        // Drop the seconds for the digest.
        format!("{} {}", self.date, self.time.get(..5).unwrap_or(&self.time))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CoffeeOrder
// ─────────────────────────────────────────────────────────────────────────────

/// A completed café order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoffeeOrder {
    pub drink_type: String,
    pub size: String,
    pub milk: String,
    #[serde(default)]
    pub extras: Vec<String>,
    pub name: String,
    #[serde(flatten)]
    pub stamp: Stamp,
}

impl Record for CoffeeOrder {
    fn stamp(&self) -> &Stamp {
        &self.stamp
    }

    fn label(&self) -> String {
        format!("{}: {} {}", self.name, self.size, self.drink_type)
    }

    fn digest_line(&self) -> String {
        let mut line = format!(
            "{}: {} {} with {} milk",
            self.stamp.short(),
            self.size,
            self.drink_type,
            self.milk
        );
        if !self.extras.is_empty() {
            line.push_str(&format!(" (extras: {})", self.extras.join(", ")));
        }
        line.push_str(&format!(" for {}", self.name));
        line
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WellnessEntry
// ─────────────────────────────────────────────────────────────────────────────

/// A completed daily wellness check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessEntry {
    pub mood: String,
    pub energy: String,
    /// Empty when the user mentioned nothing weighing on them.
    #[serde(default)]
    pub stressors: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    pub summary: String,
    #[serde(flatten)]
    pub stamp: Stamp,
}

impl Record for WellnessEntry {
    fn stamp(&self) -> &Stamp {
        &self.stamp
    }

    fn label(&self) -> String {
        format!("{} check-in: mood {}, energy {}", self.stamp.date, self.mood, self.energy)
    }

    fn digest_line(&self) -> String {
        let mut line = format!(
            "{}: mood {}, energy {}",
            self.stamp.short(),
            self.mood,
            self.energy
        );
        if !self.objectives.is_empty() {
            line.push_str(&format!("; objectives: {}", self.objectives.join(", ")));
        }
        if !self.stressors.is_empty() {
            line.push_str(&format!("; stressors: {}", self.stressors));
        }
        line
    }
}
