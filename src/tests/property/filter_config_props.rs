//! Property-based tests for filter descriptor repair
//!
//! Tests invariants:
//! - `ensure_integrity` is idempotent
//! - Every default id survives repair exactly once
//! - `name` leads and unknown ids trail after order assignment

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use crate::core::spell_search::filter_config::{
    assign_orders, default_filters, ensure_integrity, FilterConfigStore, FilterDescriptor,
    NAME_ORDER, TRAILING_ORDER_BASE,
};
use crate::core::spell_search::settings::MemorySettings;

fn arb_id() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(default_filters().into_iter().map(|f| f.id).collect::<Vec<_>>()),
        Just(String::new()),
        Just("  ".to_string()),
        "custom[a-c]{1,2}",
        Just(" level ".to_string()),
    ]
}

fn arb_descriptors() -> impl Strategy<Value = Vec<FilterDescriptor>> {
    prop::collection::vec(
        (arb_id(), 0u32..2000, any::<bool>()).prop_map(|(id, order, enabled)| FilterDescriptor {
            id,
            order,
            enabled,
            ..Default::default()
        }),
        0..24,
    )
}

proptest! {
    #[test]
    fn prop_ensure_integrity_idempotent(filters in arb_descriptors()) {
        let once = ensure_integrity(filters);
        let twice = ensure_integrity(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_defaults_always_present(filters in arb_descriptors()) {
        let repaired = ensure_integrity(filters);
        let ids: Vec<&str> = repaired.iter().map(|f| f.id.as_str()).collect();
        let unique: HashSet<&str> = ids.iter().copied().collect();
        prop_assert_eq!(unique.len(), ids.len());
        for default in default_filters() {
            prop_assert!(unique.contains(default.id.as_str()), "missing {}", default.id);
        }
        prop_assert!(ids.iter().all(|id| !id.trim().is_empty()));
    }

    #[test]
    fn prop_orders_place_name_first_and_unknown_last(filters in arb_descriptors()) {
        let ordered = assign_orders(ensure_integrity(filters));
        prop_assert_eq!(ordered[0].id.as_str(), "name");
        prop_assert_eq!(ordered[0].order, NAME_ORDER);
        for filter in ordered.iter().filter(|f| f.id.starts_with("custom")) {
            prop_assert!(filter.order >= TRAILING_ORDER_BASE);
        }
        let orders: Vec<u32> = ordered.iter().map(|f| f.order).collect();
        let mut sorted = orders.clone();
        sorted.sort_unstable();
        prop_assert_eq!(orders, sorted);
    }

    /// Property: saving then loading returns what was saved
    #[test]
    fn prop_save_then_load_is_stable(filters in arb_descriptors()) {
        let store = FilterConfigStore::new(Arc::new(MemorySettings::new()));
        let saved = store.save(filters).unwrap();
        prop_assert_eq!(store.load(), saved);
    }
}
