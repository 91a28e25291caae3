//! Range Unit Service
//!
//! Converts heterogeneous spell range units into one comparable scalar,
//! "range-feet". Comparisons always happen in range-feet; metric display is
//! a presentation concern (see [`super::display`]).

use serde::{Deserialize, Serialize};

/// Feet per meter used for canonicalization.
pub const FEET_PER_METER: f64 = 3.28084;

/// Feet per kilometer used for canonicalization.
pub const FEET_PER_KILOMETER: f64 = 3280.84;

/// Feet per mile.
pub const FEET_PER_MILE: u32 = 5280;

/// Recognized range units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeUnit {
    SelfOnly,
    Touch,
    Feet,
    Miles,
    Meters,
    Kilometers,
    Special,
}

impl RangeUnit {
    /// Parse a host unit id. Unknown units yield `None`.
    pub fn parse(units: &str) -> Option<Self> {
        match units.trim().to_ascii_lowercase().as_str() {
            "self" => Some(Self::SelfOnly),
            "touch" => Some(Self::Touch),
            "ft" => Some(Self::Feet),
            "mi" => Some(Self::Miles),
            "m" => Some(Self::Meters),
            "km" => Some(Self::Kilometers),
            "spec" => Some(Self::Special),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelfOnly => "self",
            Self::Touch => "touch",
            Self::Feet => "ft",
            Self::Miles => "mi",
            Self::Meters => "m",
            Self::Kilometers => "km",
            Self::Special => "spec",
        }
    }

    /// Whether the unit carries a distance (as opposed to self/touch/special).
    pub fn is_distance(self) -> bool {
        matches!(self, Self::Feet | Self::Miles | Self::Meters | Self::Kilometers)
    }

    /// Canonicalize `value` in this unit to range-feet.
    pub fn to_feet(self, value: u32) -> u32 {
        match self {
            Self::SelfOnly | Self::Touch | Self::Special => 0,
            Self::Feet => value,
            Self::Miles => value.saturating_mul(FEET_PER_MILE),
            Self::Meters => round_to_u32(f64::from(value) * FEET_PER_METER),
            Self::Kilometers => round_to_u32(f64::from(value) * FEET_PER_KILOMETER),
        }
    }
}

fn round_to_u32(feet: f64) -> u32 {
    let rounded = feet.round();
    if rounded >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        rounded as u32
    }
}

/// Canonical range in feet, or `None` when the units are unknown.
pub fn canonical_feet(value: u32, units: &str) -> Option<u32> {
    RangeUnit::parse(units).map(|unit| unit.to_feet(value))
}

/// Inclusive `{min?, max?}` bounds in range-feet.
///
/// Absent bounds mean 0 and +infinity respectively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

impl RangeBounds {
    /// Unbounded on both sides.
    pub const UNBOUNDED: RangeBounds = RangeBounds {
        min: None,
        max: None,
    };

    /// Build bounds, returning `None` when `min > max`.
    pub fn new(min: Option<u32>, max: Option<u32>) -> Option<Self> {
        match (min, max) {
            (Some(lo), Some(hi)) if lo > hi => None,
            _ => Some(Self { min, max }),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Inclusive containment check on range-feet.
    pub fn contains(&self, feet: u32) -> bool {
        self.min.map_or(true, |lo| feet >= lo) && self.max.map_or(true, |hi| feet <= hi)
    }
}
