//! Property-based tests for parley_memory.
//!
//! Multi-value normalization and the append-only store contract must hold for
//! every input, not just the hand-picked cases in the unit tests.

use proptest::prelude::*;

use parley_memory::entry::{build_coffee_order, split_multi_value};
use parley_memory::{CoffeeOrder, RecordStore};

// ============================================================================
// Strategies
// ============================================================================

/// A word that is never the "none" sentinel and carries no comma.
fn arb_word() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z ]{0,10}[a-zA-Z]"
        .prop_filter("sentinel", |w| !w.eq_ignore_ascii_case("none"))
}

/// Whitespace padding around a piece.
fn arb_pad() -> impl Strategy<Value = String> {
    "[ \t]{0,3}"
}

fn arb_order() -> impl Strategy<Value = CoffeeOrder> {
    (arb_word(), prop::sample::select(vec!["small", "medium", "large"]), arb_word())
        .prop_map(|(drink, size, name)| {
            build_coffee_order(&drink, size, "oat", &"caramel".into(), &name)
        })
}

// ============================================================================
// split_multi_value
// ============================================================================

proptest! {
    #[test]
    fn split_pieces_are_trimmed_and_non_empty(raw in ".{0,60}") {
        for piece in split_multi_value(&raw) {
            prop_assert!(!piece.is_empty());
            prop_assert_eq!(piece.trim(), piece.as_str());
            prop_assert!(!piece.contains(','));
            prop_assert!(!piece.eq_ignore_ascii_case("none"));
        }
    }

    #[test]
    fn split_recovers_padded_words(
        words in prop::collection::vec((arb_pad(), arb_word(), arb_pad()), 0..6),
        trailing_empties in 0usize..3,
    ) {
        let mut raw = words
            .iter()
            .map(|(l, w, r)| format!("{l}{w}{r}"))
            .collect::<Vec<_>>()
            .join(",");
        raw.push_str(&",  ".repeat(trailing_empties));

        let expected: Vec<String> = words.into_iter().map(|(_, w, _)| w).collect();
        prop_assert_eq!(split_multi_value(&raw), expected);
    }

    #[test]
    fn split_none_in_any_case_is_empty(flips in prop::collection::vec(any::<bool>(), 4)) {
        let sentinel: String = "none"
            .chars()
            .zip(flips)
            .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
            .collect();
        prop_assert!(split_multi_value(&sentinel).is_empty());
        let padded = format!("  {sentinel} ");
        prop_assert!(split_multi_value(&padded).is_empty());
    }
}

// ============================================================================
// RecordStore
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn append_extends_any_starting_sequence(
        existing in prop::collection::vec(arb_order(), 0..6),
        extra in arb_order(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path().join("orders.json"));
        for order in &existing {
            store.append(order).unwrap();
        }

        let before = store.load();
        prop_assert_eq!(&before, &existing);

        let total = store.append(&extra).unwrap();
        prop_assert_eq!(total, existing.len() + 1);

        let after = store.load();
        prop_assert_eq!(&after[..existing.len()], &before[..]);
        prop_assert_eq!(after.last(), Some(&extra));
    }
}
