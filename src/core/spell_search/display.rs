//! Row Details
//!
//! Projects a spell record into the metadata pieces shown in a result row,
//! according to a visibility bitset. Labels stay opaque localization keys.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use super::range_units::RangeUnit;
use super::record::{SpellRange, SpellRecord};
use super::settings::{SettingsStore, KEY_DETAILS_VISIBILITY};

const METERS_PER_FOOT: f64 = 0.3048;
const KILOMETERS_PER_MILE: f64 = 1.609344;

/// Which metadata pieces a row shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetailVisibility(u8);

impl DetailVisibility {
    pub const NONE: Self = Self(0);
    pub const LEVEL: Self = Self(1 << 0);
    pub const SCHOOL: Self = Self(1 << 1);
    pub const CASTING_TIME: Self = Self(1 << 2);
    pub const RANGE: Self = Self(1 << 3);
    pub const PROPERTIES: Self = Self(1 << 4);
    pub const SAVE: Self = Self(1 << 5);
    pub const SOURCE: Self = Self(1 << 6);
    pub const ALL: Self = Self(0x7f);

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Unknown bits are dropped.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Stored visibility, everything visible when unset or unreadable.
    pub fn load(settings: &dyn SettingsStore) -> Self {
        match settings.get(KEY_DETAILS_VISIBILITY) {
            Ok(Some(JsonValue::Number(n))) => n
                .as_u64()
                .and_then(|bits| u8::try_from(bits).ok())
                .map(Self::from_bits)
                .unwrap_or(Self::ALL),
            Ok(_) => Self::ALL,
            Err(e) => {
                warn!(error = %e, "Failed to read detail visibility");
                Self::ALL
            }
        }
    }
}

impl Default for DetailVisibility {
    fn default() -> Self {
        Self::ALL
    }
}

/// One displayed metadata piece.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum SpellDetail {
    /// Localization key such as `SPELLBOOK.Level.3`.
    Level(String),
    School(String),
    CastingTime(String),
    Range(String),
    Properties(Vec<String>),
    Save(String),
    Source(String),
}

/// Visible details for `record`, in display order.
pub fn spell_details(record: &SpellRecord, visibility: DetailVisibility, metric: bool) -> Vec<SpellDetail> {
    let mut details = Vec::new();

    if visibility.contains(DetailVisibility::LEVEL) {
        if let Some(level) = record.level {
            details.push(SpellDetail::Level(format!("SPELLBOOK.Level.{level}")));
        }
    }
    if visibility.contains(DetailVisibility::SCHOOL) {
        if let Some(school) = &record.school {
            details.push(SpellDetail::School(format!("SPELLBOOK.School.{school}")));
        }
    }
    if visibility.contains(DetailVisibility::CASTING_TIME) {
        if let Some(activation) = &record.activation {
            details.push(SpellDetail::CastingTime(format!(
                "{} {}",
                activation.value, activation.kind
            )));
        }
    }
    if visibility.contains(DetailVisibility::RANGE) {
        if let Some(range) = &record.range {
            details.push(SpellDetail::Range(format_range(range, metric)));
        }
    }
    if visibility.contains(DetailVisibility::PROPERTIES) && !record.properties.is_empty() {
        details.push(SpellDetail::Properties(record.properties.iter().cloned().collect()));
    }
    if visibility.contains(DetailVisibility::SAVE) {
        if let Some(save) = &record.save {
            details.push(SpellDetail::Save(save.ability.clone()));
        }
    }
    if visibility.contains(DetailVisibility::SOURCE) {
        if let Some(source) = record.source_label.as_ref().or(record.source_id.as_ref()) {
            details.push(SpellDetail::Source(source.clone()));
        }
    }
    details
}

/// Render a range, converting distances to metric when asked.
pub fn format_range(range: &SpellRange, metric: bool) -> String {
    match RangeUnit::parse(&range.units) {
        Some(unit) if !unit.is_distance() => unit.as_str().to_string(),
        Some(RangeUnit::Feet) if metric => {
            format!("{} m", one_decimal(f64::from(range.value) * METERS_PER_FOOT))
        }
        Some(RangeUnit::Miles) if metric => {
            format!("{} km", one_decimal(f64::from(range.value) * KILOMETERS_PER_MILE))
        }
        Some(unit) => format!("{} {}", range.value, unit.as_str()),
        None => format!("{} {}", range.value, range.units),
    }
}

fn one_decimal(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.1}")
    }
}
