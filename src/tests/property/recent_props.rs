//! Property-based tests for the recent searches list
//!
//! Tests invariants:
//! - Length never exceeds the limit
//! - Entries are unique and trimmed
//! - The last non-blank add is at the head

use std::collections::HashSet;

use proptest::prelude::*;

use crate::core::spell_search::recent::RecentSearches;

proptest! {
    #[test]
    fn prop_recent_list_invariants(
        limit in 1usize..10,
        queries in prop::collection::vec("[ a-c]{0,4}", 0..30),
    ) {
        let mut recent = RecentSearches::new(limit);
        let mut last = None;
        for query in &queries {
            if recent.add(query) {
                last = Some(query.trim().to_string());
            }
        }

        prop_assert!(recent.len() <= limit);
        let unique: HashSet<&String> = recent.list().iter().collect();
        prop_assert_eq!(unique.len(), recent.len());
        for entry in recent.list() {
            prop_assert!(!entry.is_empty());
            prop_assert_eq!(entry.trim(), entry.as_str());
        }
        prop_assert_eq!(recent.list().first().cloned(), last);
    }

    /// Property: re-adding an entry only moves it to the head
    #[test]
    fn prop_readd_only_reorders(queries in prop::collection::vec("[a-d]{1,3}", 1..10)) {
        let mut recent = RecentSearches::new(20);
        for query in &queries {
            recent.add(query);
        }
        let before: HashSet<String> = recent.list().iter().cloned().collect();
        let target = queries[0].clone();

        recent.add(&target);
        let after: HashSet<String> = recent.list().iter().cloned().collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(&recent.list()[0], &target);
    }

    /// Property: persisted entries survive a reload unchanged
    #[test]
    fn prop_from_entries_roundtrip(queries in prop::collection::vec("[a-d]{1,3}", 0..12)) {
        let mut recent = RecentSearches::new(8);
        for query in &queries {
            recent.add(query);
        }
        let reloaded = RecentSearches::from_entries(recent.list().to_vec(), 8);
        prop_assert_eq!(reloaded.list(), recent.list());
    }
}
