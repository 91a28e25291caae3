//! Property-based tests for the filter pipeline
//!
//! Tests invariants:
//! - Output is an order-preserving subset of the input
//! - Per-level statistics add up
//! - Empty state is the identity
//! - Adding a filter never widens the result
//! - Advanced queries agree with the state they imply
//! - A field constrained twice is rejected
//! - Committed level queries only show that level

use std::time::Instant;

use proptest::prelude::*;

use crate::core::spell_search::filter_state::FilterState;
use crate::core::spell_search::pipeline::FilterPipeline;
use crate::core::spell_search::query_executor::{apply_to_state, evaluate};
use crate::core::spell_search::error::ParseError;
use crate::core::spell_search::query_parser::QueryParser;
use crate::core::spell_search::range_units::RangeBounds;
use crate::core::spell_search::record::SpellRecord;
use crate::core::spell_search::session::SessionEvent;
use crate::core::spell_search::suggestions::NavKey;
use crate::tests::common::{create_test_session, sample_corpus};

// ============================================================================
// Strategies for generating test inputs
// ============================================================================

fn arb_corpus() -> impl Strategy<Value = Vec<SpellRecord>> {
    let corpus = sample_corpus();
    let len = corpus.len();
    prop::sample::subsequence(corpus, 0..=len)
}

fn arb_choice(values: &'static [&'static str]) -> impl Strategy<Value = String> {
    prop::sample::select(values).prop_map(str::to_string)
}

fn arb_bounds() -> impl Strategy<Value = RangeBounds> {
    (prop::option::of(0u32..200), prop::option::of(0u32..200)).prop_map(|(a, b)| {
        match (a, b) {
            (Some(lo), Some(hi)) if lo > hi => RangeBounds {
                min: Some(hi),
                max: Some(lo),
            },
            (min, max) => RangeBounds { min, max },
        }
    })
}

/// Filter state without source filters, which can self-heal.
fn arb_state() -> impl Strategy<Value = FilterState> {
    (
        arb_choice(&["", "fire", "bolt", "\"fire bolt\"", "hand", "\"\""]),
        arb_choice(&["", "all", "0", "1", "3"]),
        arb_choice(&["", "evocation", "enchantment", "abjuration"]),
        arb_choice(&["", "fire", "cold"]),
        arb_choice(&["", "true", "false"]),
        arb_bounds(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |(name, level, school, damage_type, concentration, range, ritual, prepared)| {
                FilterState {
                    name,
                    level,
                    school,
                    damage_type,
                    concentration,
                    range,
                    ritual,
                    prepared,
                    ..Default::default()
                }
            },
        )
}

/// Advanced query text with at most one leaf per field.
fn arb_query() -> impl Strategy<Value = String> {
    (
        prop::option::of(0u32..=9),
        prop::option::of(arb_choice(&["evocation", "enchantment", "conjuration"])),
        prop::option::of(arb_choice(&["fire", "cold"])),
        prop::option::of(arb_choice(&["*-30", "30-*", "30-120", "150"])),
        prop::option::of(arb_choice(&["save:true", "concentration:yes", "ritual:true", "favorited:yes"])),
        prop::option::of(arb_choice(&["level:1", "range:60-*", "school:abjuration", "damage:cold", "conc:no"])),
    )
        .prop_filter_map("query needs at least one leaf", |(level, school, damage, range, flag, extra)| {
            let mut leaves = Vec::new();
            if let Some(level) = level {
                leaves.push(format!("level:{level}"));
            }
            if let Some(school) = school {
                leaves.push(format!("school:{school}"));
            }
            if let Some(damage) = damage {
                leaves.push(format!("damage:{damage}"));
            }
            if let Some(range) = range {
                leaves.push(format!("range:{range}"));
            }
            if let Some(flag) = flag {
                leaves.push(flag);
            }
            // May constrain a field a second time.
            if let Some(extra) = extra {
                leaves.push(extra);
            }
            (!leaves.is_empty()).then(|| format!("^{}", leaves.join(" AND ")))
        })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: output is an order-preserving subset and the counts agree
    #[test]
    fn prop_output_is_ordered_subset(corpus in arb_corpus(), state in arb_state()) {
        let outcome = FilterPipeline::new(&state).run(&corpus);

        prop_assert_eq!(outcome.total_filtered, outcome.spells.len());
        prop_assert!(outcome.spells.len() <= corpus.len());

        let mut cursor = corpus.iter();
        for spell in &outcome.spells {
            prop_assert!(
                cursor.any(|r| r.id == spell.id),
                "{} is missing or out of order",
                spell.id
            );
        }

        let counted: usize = outcome.by_level.values().map(|s| s.visible).sum();
        let leveled = outcome.spells.iter().filter(|s| s.level.is_some()).count();
        prop_assert_eq!(counted, leveled);
        for stats in outcome.by_level.values() {
            prop_assert!(stats.prepared <= stats.visible);
            prop_assert!(stats.countable_prepared <= stats.countable);
        }
    }

    /// Property: the default state passes every record
    #[test]
    fn prop_empty_state_is_identity(corpus in arb_corpus()) {
        let state = FilterState::default();
        let outcome = FilterPipeline::new(&state).run(&corpus);
        let expected: Vec<&str> = corpus.iter().map(|r| r.id.as_str()).collect();
        prop_assert_eq!(outcome.ids(), expected);
    }

    /// Property: narrowing the level never adds results
    #[test]
    fn prop_level_filter_narrows(state in arb_state(), level in arb_choice(&["0", "1", "3"])) {
        let corpus = sample_corpus();
        let state = FilterState { level: String::new(), ..state };
        let wide = FilterPipeline::new(&state).run(&corpus);

        let narrowed = FilterState { level, ..state.clone() };
        let narrow = FilterPipeline::new(&narrowed).run(&corpus);

        let wide_ids = wide.ids();
        for id in narrow.ids() {
            prop_assert!(wide_ids.contains(&id), "{} appeared after narrowing", id);
        }
    }

    /// Property: evaluating a query equals filtering with the state it implies
    #[test]
    fn prop_query_agrees_with_applied_state(raw in arb_query()) {
        let mut parser = QueryParser::default();
        let ast = match parser.parse(&raw) {
            Ok(ast) => ast,
            Err(ParseError::Malformed(message)) => {
                prop_assert!(message.contains("more than once"), "{}: {}", raw, message);
                return Ok(());
            }
            Err(e) => return Err(TestCaseError::fail(format!("{raw}: {e}"))),
        };

        let mut state = FilterState::default();
        state.apply_patch(&apply_to_state(&ast)).unwrap();

        let corpus = sample_corpus();
        let outcome = FilterPipeline::new(&state).run(&corpus);
        let ids = outcome.ids();
        for record in &corpus {
            prop_assert_eq!(
                evaluate(&ast, record),
                ids.contains(&record.id.as_str()),
                "{} disagrees for {}",
                raw,
                record.id
            );
        }
    }

    /// Property: constraining a field twice never parses
    #[test]
    fn prop_repeated_field_is_rejected(raw in arb_query()) {
        let first = raw.trim_start_matches('^').split(" AND ").next().unwrap_or_default().to_string();
        let repeated = format!("{raw} AND {first}");
        let mut parser = QueryParser::default();
        prop_assert!(matches!(parser.parse(&repeated), Err(ParseError::Malformed(_))), "{}", repeated);
    }

    /// Property: a committed level query narrows session results to that level
    #[test]
    fn prop_session_level_commit(level in 0u8..=9) {
        let (_settings, mut session) = create_test_session();
        let now = Instant::now();
        session.input(&format!("^level:{level}"), now);
        prop_assert_eq!(session.key(NavKey::Enter, now), SessionEvent::RerunPipeline);

        let outcome = session.results(now);
        let expected = sample_corpus().iter().filter(|r| r.level == Some(level)).count();
        prop_assert_eq!(outcome.total_filtered, expected);
        prop_assert!(outcome.spells.iter().all(|r| r.level == Some(level)));
    }
}
