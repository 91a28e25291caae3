//! Property-based tests for range units and bounds
//!
//! Tests invariants:
//! - Canonical feet grow with the raw value for every distance unit
//! - Miles always exceed the same number of feet
//! - Widening bounds never drops a match

use proptest::prelude::*;

use crate::core::spell_search::range_units::{canonical_feet, RangeBounds};

fn arb_unit() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["ft", "mi", "m", "km"])
}

proptest! {
    /// Property: canonicalization is monotone in the value
    #[test]
    fn prop_canonical_feet_monotone(a in 0u32..100_000, b in 0u32..100_000, unit in arb_unit()) {
        let (lo, hi) = (a.min(b), a.max(b));
        let lo_feet = canonical_feet(lo, unit).unwrap();
        let hi_feet = canonical_feet(hi, unit).unwrap();
        prop_assert!(lo_feet <= hi_feet);
    }

    /// Property: one mile is longer than one foot for any positive count
    #[test]
    fn prop_miles_exceed_feet(value in 1u32..10_000) {
        prop_assert!(canonical_feet(value, "mi").unwrap() > canonical_feet(value, "ft").unwrap());
    }

    /// Property: a wider window contains everything a narrower one does
    #[test]
    fn prop_widening_keeps_matches(
        min in 0u32..1000,
        span in 0u32..1000,
        widen_lo in 0u32..100,
        widen_hi in 0u32..100,
        feet in 0u32..3000,
    ) {
        let narrow = RangeBounds::new(Some(min), Some(min + span)).unwrap();
        let wide = RangeBounds::new(Some(min.saturating_sub(widen_lo)), Some(min + span + widen_hi)).unwrap();
        if narrow.contains(feet) {
            prop_assert!(wide.contains(feet));
        }
        prop_assert!(RangeBounds::UNBOUNDED.contains(feet));
    }

    /// Property: inverted bounds are rejected
    #[test]
    fn prop_inverted_bounds_rejected(lo in 1u32..1000, gap in 1u32..1000) {
        prop_assert!(RangeBounds::new(Some(lo + gap), Some(lo)).is_none());
    }
}
