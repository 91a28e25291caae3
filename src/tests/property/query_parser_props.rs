//! Property-based tests for advanced query parsing
//!
//! Tests invariants:
//! - Parsing arbitrary text never panics
//! - Cached parses equal uncached ones
//! - Valid conjunctions keep one leaf per expression

use proptest::prelude::*;

use crate::core::spell_search::fields::FieldRegistry;
use crate::core::spell_search::query_parser::{parse_body, QueryParser};

fn arb_leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..=9).prop_map(|level| format!("level:{level}")),
        prop::sample::select(vec!["fire", "cold", "psychic"]).prop_map(|d| format!("dmg:{d}")),
        prop::sample::select(vec!["TRUE", "no", "Yes"]).prop_map(|b| format!("ritual:{b}")),
        (0u32..500, 0u32..500).prop_map(|(a, b)| format!("range:{}-{}", a.min(b), a.max(b))),
        Just("school:evo".to_string()),
        Just("cast:bonus".to_string()),
    ]
}

proptest! {
    /// Property: any body yields a result without panicking
    #[test]
    fn prop_parse_is_total(body in "\\PC{0,40}") {
        let registry = FieldRegistry::new();
        let _ = parse_body(&registry, &body);
    }

    /// Property: the memoizing parser returns exactly what a fresh parse does
    #[test]
    fn prop_cached_parse_matches_uncached(body in "[a-zA-Z:*0-9 -]{0,30}") {
        let registry = FieldRegistry::shared();
        let mut parser = QueryParser::new(registry.clone());
        let raw = format!("^{body}");

        let first = parser.parse(&raw);
        let second = parser.parse(&raw);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first, parse_body(&registry, &body));
        prop_assert_eq!(parser.cached_len(), 1);
    }

    /// Property: a conjunction of valid leaves parses to that many leaves
    #[test]
    fn prop_conjunction_leaf_count(leaves in prop::collection::vec(arb_leaf(), 1..6)) {
        let mut parser = QueryParser::default();
        let raw = format!("^{}", leaves.join(" AND "));
        let ast = parser.parse(&raw).unwrap();
        prop_assert_eq!(ast.leaves().len(), leaves.len());
    }

    /// Property: text without the prefix is never advanced
    #[test]
    fn prop_standard_text_is_rejected(body in "[a-z ]{0,20}") {
        let mut parser = QueryParser::default();
        prop_assert!(parser.parse(&body).is_err());
    }
}
