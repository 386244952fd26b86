//! [`Form`] – what a session collects.
//!
//! A form ties a record kind to everything the conversation needs around it:
//! the capture tool's name and typed arguments, the persona and the
//! *instructed* question order handed to the reasoning engine, the confirmation
//! line spoken after saving, and the continuity blurb seeded into the next
//! session.
//!
//! Question order is guidance only.  The engine is told to ask one field at a
//! time and confirm before saving, but nothing here enforces it: the only
//! mechanical step is the capture call itself.

use std::fmt::Debug;

use parley_memory::entry::{MultiValue, build_coffee_order, build_wellness_entry};
use parley_memory::{CoffeeOrder, Record, WellnessEntry};
use parley_types::FormKind;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// A record kind that can be collected conversationally.
pub trait Form: Record {
    const KIND: FormKind;
    /// Name of the capture tool exposed to the engine.
    const CAPTURE_TOOL: &'static str;

    /// Typed arguments of the capture tool; their schema is sent to the engine.
    type Args: DeserializeOwned + JsonSchema + Debug + Send + Sync;
    /// In-progress view of the record, every field unset until capture.
    type Draft: Default + Clone + Debug + PartialEq + Send + Sync;

    /// Tells the engine *when* to call the capture tool.
    fn capture_description() -> &'static str;

    /// Normalize captured arguments into a record stamped now.
    fn build(args: &Self::Args) -> Self;

    fn draft_of(&self) -> Self::Draft;

    /// Spoken back after a successful save; echoes the key values.
    fn confirmation(&self) -> String;

    /// Who the agent is and how it sounds.
    fn persona() -> &'static str;

    /// The instructed question order, one step per field plus confirmation.
    fn instructed_steps() -> &'static [&'static str];

    /// First line the agent speaks.
    fn greeting() -> &'static str;

    /// Continuity text about this (previous) record for the next session.
    fn continuity(&self) -> String;
}

/// Assemble the full instructions for one session.
///
/// `previous` is a one-time snapshot taken at session start; it is not
/// refreshed mid-conversation.
pub fn instructions<F: Form>(previous: Option<&F>) -> String {
    let steps = F::instructed_steps()
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}", i + 1, step))
        .collect::<Vec<_>>()
        .join("\n");

    let continuity = previous
        .map(|p| p.continuity())
        .unwrap_or_else(|| "This is the first conversation on record.".to_string());

    format!(
        "{persona}\n\
         Start with: '{greeting}'\n\n\
         ## Steps\n{steps}\n\n\
         After collecting and confirming ALL information, call the `{tool}` tool exactly once.\n\
         If the user asks about earlier conversations, call the `recall` tool and summarise its result.\n\
         If a tool reports a problem, apologise briefly and offer to try again.\n\n\
         ## Continuity\n{continuity}",
        persona = F::persona(),
        greeting = F::greeting(),
        tool = F::CAPTURE_TOOL,
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Coffee order
// ─────────────────────────────────────────────────────────────────────────────

/// Arguments of the `save_order` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CoffeeOrderArgs {
    /// The type of coffee drink (e.g. latte, cappuccino, espresso).
    pub drink_type: String,
    /// The size of the drink (small, medium, large).
    pub size: String,
    /// The type of milk (whole, skim, oat, almond, soy, none).
    pub milk: String,
    /// Extras requested (sugar, chocolate, caramel, whipped cream), as a list
    /// or comma-separated text; 'none' for no extras.
    pub extras: MultiValue,
    /// The customer's name for the order.
    pub name: String,
}

/// Unset-until-captured view of a [`CoffeeOrder`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoffeeOrderDraft {
    pub drink_type: Option<String>,
    pub size: Option<String>,
    pub milk: Option<String>,
    pub extras: Vec<String>,
    pub name: Option<String>,
}

fn milk_phrase(milk: &str) -> String {
    if milk.is_empty() || milk.eq_ignore_ascii_case("none") {
        "no milk".to_string()
    } else {
        format!("{milk} milk")
    }
}

impl Form for CoffeeOrder {
    const KIND: FormKind = FormKind::Coffee;
    const CAPTURE_TOOL: &'static str = "save_order";

    type Args = CoffeeOrderArgs;
    type Draft = CoffeeOrderDraft;

    fn capture_description() -> &'static str {
        "Save the completed coffee order. Use this tool only once you have collected \
         ALL order information from the customer (drink, size, milk, extras, name) \
         and they have confirmed it."
    }

    fn build(args: &CoffeeOrderArgs) -> Self {
        build_coffee_order(&args.drink_type, &args.size, &args.milk, &args.extras, &args.name)
    }

    fn draft_of(&self) -> CoffeeOrderDraft {
        CoffeeOrderDraft {
            drink_type: Some(self.drink_type.clone()),
            size: Some(self.size.clone()),
            milk: Some(self.milk.clone()),
            extras: self.extras.clone(),
            name: Some(self.name.clone()),
        }
    }

    fn confirmation(&self) -> String {
        let who = if self.name.is_empty() {
            String::new()
        } else {
            format!(", {}", self.name)
        };
        format!(
            "Perfect! I've got your order saved{who}. Your {} {} with {} will be ready shortly. \
             Thank you for visiting BrewBerry Café!",
            self.size,
            self.drink_type,
            milk_phrase(&self.milk),
        )
    }

    fn persona() -> &'static str {
        "You are a friendly barista at BrewBerry Café. Keep your responses short, \
         friendly, and conversational."
    }

    fn instructed_steps() -> &'static [&'static str] {
        &[
            "Ask what drink they would like (espresso, latte, cappuccino, americano, etc.).",
            "Ask what size (small, medium, large).",
            "Ask for any milk preference (whole, skim, oat, almond, soy).",
            "Ask whether they would like any extras (sugar, chocolate, caramel, whipped cream).",
            "Ask for their name for the order.",
            "Read the order back and ask them to confirm it.",
        ]
    }

    fn greeting() -> &'static str {
        "Hi! Welcome to BrewBerry Café. I'm your barista today. What can I get started for you?"
    }

    fn continuity(&self) -> String {
        format!(
            "The most recent order ({}) was a {} {} with {} for {}. \
             If the same customer returns you may offer to repeat it.",
            self.stamp.date,
            self.size,
            self.drink_type,
            milk_phrase(&self.milk),
            self.name,
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wellness check-in
// ─────────────────────────────────────────────────────────────────────────────

/// Arguments of the `save_checkin` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WellnessArgs {
    /// How the user describes their mood today, in their own words.
    pub mood: String,
    /// Their energy level (e.g. low, medium, high).
    pub energy: String,
    /// One to three things they want to get done today, as a list or
    /// comma-separated text; 'none' if they have nothing in mind.
    pub objectives: MultiValue,
    /// Anything currently stressing them, if they mentioned it.
    #[serde(default)]
    pub stressors: Option<String>,
    /// A one-sentence recap of the check-in, if you have one.
    #[serde(default)]
    pub summary: Option<String>,
}

/// Unset-until-captured view of a [`WellnessEntry`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WellnessDraft {
    pub mood: Option<String>,
    pub energy: Option<String>,
    pub stressors: Option<String>,
    pub objectives: Vec<String>,
    pub summary: Option<String>,
}

impl Form for WellnessEntry {
    const KIND: FormKind = FormKind::Wellness;
    const CAPTURE_TOOL: &'static str = "save_checkin";

    type Args = WellnessArgs;
    type Draft = WellnessDraft;

    fn capture_description() -> &'static str {
        "Save today's wellness check-in. Call this once you know the user's mood, \
         energy and objectives and you have read the recap back to them."
    }

    fn build(args: &WellnessArgs) -> Self {
        build_wellness_entry(
            &args.mood,
            &args.energy,
            &args.objectives,
            args.stressors.as_deref(),
            args.summary.as_deref(),
        )
    }

    fn draft_of(&self) -> WellnessDraft {
        WellnessDraft {
            mood: Some(self.mood.clone()),
            energy: Some(self.energy.clone()),
            stressors: Some(self.stressors.clone()).filter(|s| !s.is_empty()),
            objectives: self.objectives.clone(),
            summary: Some(self.summary.clone()),
        }
    }

    fn confirmation(&self) -> String {
        let goals = if self.objectives.is_empty() {
            "no set goals for today".to_string()
        } else {
            format!("your goals for today: {}", self.objectives.join(", "))
        };
        format!(
            "Thanks for checking in. I've noted that you're feeling {} with {} energy, and {}. \
             I'll remember this next time we talk.",
            self.mood, self.energy, goals
        )
    }

    fn persona() -> &'static str {
        "You are a warm, supportive wellness companion running a short daily check-in. \
         You are not a clinician: never diagnose, never give medical advice, and suggest \
         professional help if the user describes a crisis. Keep responses brief."
    }

    fn instructed_steps() -> &'static [&'static str] {
        &[
            "Ask how they are feeling today (mood).",
            "Ask about their energy level.",
            "Ask whether anything is stressing them right now (optional).",
            "Ask for one to three things they would like to get done today.",
            "Recap mood, energy and objectives in one sentence and ask if that sounds right.",
        ]
    }

    fn greeting() -> &'static str {
        "Hi, it's good to hear from you. How are you feeling today?"
    }

    fn continuity(&self) -> String {
        let mut blurb = format!(
            "Last check-in ({}): mood {}, energy {}.",
            self.stamp.date, self.mood, self.energy
        );
        if !self.objectives.is_empty() {
            blurb.push_str(&format!(
                " They planned to: {}. Gently ask how that went.",
                self.objectives.join(", ")
            ));
        }
        blurb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::ToolSpec;

    fn coffee_args(json: serde_json::Value) -> CoffeeOrderArgs {
        serde_json::from_value(json).expect("valid args")
    }

    #[test]
    fn coffee_args_accept_joined_extras() {
        let args = coffee_args(serde_json::json!({
            "drink_type": "latte", "size": "medium", "milk": "oat",
            "extras": "caramel, sugar", "name": "Maya"
        }));
        let order = CoffeeOrder::build(&args);
        assert_eq!(order.extras, vec!["caramel", "sugar"]);
    }

    #[test]
    fn coffee_args_require_every_field() {
        for missing in ["drink_type", "size", "milk", "extras", "name"] {
            let mut json = serde_json::json!({
                "drink_type": "espresso", "size": "small", "milk": "none",
                "extras": "none", "name": "Ana"
            });
            json.as_object_mut().unwrap().remove(missing);
            assert!(
                serde_json::from_value::<CoffeeOrderArgs>(json).is_err(),
                "{missing} should be required"
            );
        }
    }

    #[test]
    fn coffee_none_sentinels_read_naturally() {
        let args = coffee_args(serde_json::json!({
            "drink_type": "espresso", "size": "small", "milk": "none",
            "extras": "None", "name": "Ana"
        }));
        let order = CoffeeOrder::build(&args);
        assert!(order.extras.is_empty());
        assert!(order.confirmation().contains("small espresso with no milk"));
    }

    #[test]
    fn coffee_confirmation_echoes_key_values() {
        let args = coffee_args(serde_json::json!({
            "drink_type": "cappuccino", "size": "large", "milk": "almond",
            "extras": ["chocolate"], "name": "Leo"
        }));
        let msg = CoffeeOrder::build(&args).confirmation();
        assert!(msg.contains("Leo"));
        assert!(msg.contains("large cappuccino with almond milk"));
    }

    #[test]
    fn coffee_draft_mirrors_record() {
        let args = coffee_args(serde_json::json!({
            "drink_type": "latte", "size": "medium", "milk": "oat",
            "extras": "none", "name": "Maya"
        }));
        let draft = CoffeeOrder::build(&args).draft_of();
        assert_eq!(draft.drink_type.as_deref(), Some("latte"));
        assert!(draft.extras.is_empty());
        assert_eq!(CoffeeOrderDraft::default().name, None);
    }

    #[test]
    fn capture_schema_documents_fields() {
        let spec = ToolSpec::for_arguments::<CoffeeOrderArgs>(
            CoffeeOrder::CAPTURE_TOOL,
            CoffeeOrder::capture_description(),
        );
        let props = &spec.parameters["properties"];
        for field in ["drink_type", "size", "milk", "extras", "name"] {
            assert!(props[field].is_object(), "missing {field}");
        }
        let mut required: Vec<&str> = spec.parameters["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        required.sort_unstable();
        assert_eq!(required, vec!["drink_type", "extras", "milk", "name", "size"]);
    }

    #[test]
    fn wellness_schema_requires_mood_energy_and_objectives() {
        let spec = ToolSpec::for_arguments::<WellnessArgs>(
            WellnessEntry::CAPTURE_TOOL,
            WellnessEntry::capture_description(),
        );
        let mut required: Vec<&str> = spec.parameters["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        required.sort_unstable();
        assert_eq!(required, vec!["energy", "mood", "objectives"]);
        assert!(spec.parameters["properties"]["stressors"].is_object());
        assert!(spec.parameters["properties"]["summary"].is_object());
    }

    #[test]
    fn wellness_args_build_entry_with_fallback_summary() {
        let args: WellnessArgs = serde_json::from_value(serde_json::json!({
            "mood": "hopeful", "energy": "medium", "objectives": "gym, read"
        }))
        .unwrap();
        let entry = WellnessEntry::build(&args);
        assert_eq!(entry.summary, "mood: hopeful, energy: medium");
        assert_eq!(entry.objectives, vec!["gym", "read"]);
        assert_eq!(entry.draft_of().stressors, None);
        assert!(entry.confirmation().contains("gym, read"));
    }

    #[test]
    fn instructions_number_steps_and_embed_continuity() {
        let text = instructions::<CoffeeOrder>(None);
        assert!(text.contains("1. Ask what drink"));
        assert!(text.contains("`save_order`"));
        assert!(text.contains("first conversation on record"));

        let args = coffee_args(serde_json::json!({
            "drink_type": "mocha", "size": "small", "milk": "soy",
            "extras": "none", "name": "Ines"
        }));
        let previous = CoffeeOrder::build(&args);
        let text = instructions(Some(&previous));
        assert!(text.contains("small mocha with soy milk for Ines"));
    }

    #[test]
    fn wellness_continuity_mentions_objectives() {
        let args: WellnessArgs = serde_json::from_value(serde_json::json!({
            "mood": "tired", "energy": "low", "objectives": ["sleep early"]
        }))
        .unwrap();
        let blurb = WellnessEntry::build(&args).continuity();
        assert!(blurb.contains("sleep early"));
        assert!(instructions::<WellnessEntry>(None).contains("never give medical advice"));
    }
}
