//! Spell Records
//!
//! The immutable value object the filter core reads, plus tolerant corpus
//! ingestion from host JSON. Every field except `id` and `name` is optional;
//! missing data is "unknown" to the filters.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use super::error::CorpusError;
use super::range_units::canonical_feet;
use crate::core::vocabulary::SpellVocabulary;

// ============================================================================
// Property flags
// ============================================================================

pub const PROPERTY_RITUAL: &str = "ritual";
pub const PROPERTY_CONCENTRATION: &str = "concentration";
pub const PROPERTY_MATERIAL_CONSUMED: &str = "material-consumed";

/// Older sources tag consumed materials with the short form.
const PROPERTY_CONSUMED_SHORT: &str = "consumed";

// ============================================================================
// Types
// ============================================================================

/// Casting time, e.g. `action:1` or `minute:10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Activation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_activation_value")]
    pub value: u32,
}

fn default_activation_value() -> u32 {
    1
}

impl Activation {
    pub fn new(kind: impl Into<String>, value: u32) -> Self {
        Self {
            kind: kind.into(),
            value: value.max(1),
        }
    }

    /// Normalized `type:value` key used by the casting time filter.
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind.to_ascii_lowercase(), self.value.max(1))
    }
}

/// Spell range as stored by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpellRange {
    #[serde(default)]
    pub value: u32,
    #[serde(default)]
    pub units: String,
}

impl SpellRange {
    pub fn new(value: u32, units: impl Into<String>) -> Self {
        Self {
            value,
            units: units.into(),
        }
    }
}

/// Saving throw requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SavingThrow {
    pub ability: String,
}

/// One spell as seen by the filter core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub activation: Option<Activation>,
    #[serde(default)]
    pub range: Option<SpellRange>,
    #[serde(default)]
    pub properties: BTreeSet<String>,
    #[serde(default)]
    pub save: Option<SavingThrow>,
    #[serde(default)]
    pub damage_types: BTreeSet<String>,
    #[serde(default)]
    pub conditions: BTreeSet<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub source_label: Option<String>,
    #[serde(default)]
    pub pack_name: Option<String>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub is_prepared: bool,
    #[serde(default)]
    pub is_favorited: bool,
    /// Granted by a feature or item; excluded from prepared-spell counts.
    #[serde(default)]
    pub is_granted: bool,
    /// Always prepared; excluded from prepared-spell counts.
    #[serde(default)]
    pub is_always_prepared: bool,
}

impl SpellRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_school(mut self, school: impl Into<String>) -> Self {
        self.school = Some(school.into());
        self
    }

    pub fn with_activation(mut self, kind: impl Into<String>, value: u32) -> Self {
        self.activation = Some(Activation::new(kind, value));
        self
    }

    pub fn with_range(mut self, value: u32, units: impl Into<String>) -> Self {
        self.range = Some(SpellRange::new(value, units));
        self
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.properties.insert(property.into());
        self
    }

    pub fn with_save(mut self, ability: impl Into<String>) -> Self {
        self.save = Some(SavingThrow {
            ability: ability.into(),
        });
        self
    }

    pub fn with_damage_type(mut self, damage: impl Into<String>) -> Self {
        self.damage_types.insert(damage.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.insert(condition.into());
        self
    }

    pub fn with_source(mut self, id: impl Into<String>, label: impl Into<String>) -> Self {
        self.source_id = Some(id.into());
        self.source_label = Some(label.into());
        self
    }

    pub fn with_pack(mut self, pack_name: impl Into<String>, package_name: impl Into<String>) -> Self {
        self.pack_name = Some(pack_name.into());
        self.package_name = Some(package_name.into());
        self
    }

    pub fn prepared(mut self) -> Self {
        self.is_prepared = true;
        self
    }

    pub fn favorited(mut self) -> Self {
        self.is_favorited = true;
        self
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p.eq_ignore_ascii_case(property))
    }

    pub fn is_ritual(&self) -> bool {
        self.has_property(PROPERTY_RITUAL)
    }

    pub fn requires_concentration(&self) -> bool {
        self.has_property(PROPERTY_CONCENTRATION)
    }

    pub fn has_consumed_materials(&self) -> bool {
        self.has_property(PROPERTY_MATERIAL_CONSUMED) || self.has_property(PROPERTY_CONSUMED_SHORT)
    }

    pub fn requires_save(&self) -> bool {
        self.save.is_some()
    }

    pub fn has_damage_type(&self, damage: &str) -> bool {
        self.damage_types.iter().any(|d| d.eq_ignore_ascii_case(damage))
    }

    pub fn has_condition(&self, condition: &str) -> bool {
        self.conditions.iter().any(|c| c.eq_ignore_ascii_case(condition))
    }

    /// Normalized casting time key, e.g. `action:1`.
    pub fn casting_time_key(&self) -> Option<String> {
        self.activation.as_ref().map(Activation::key)
    }

    /// Range in range-feet, or `None` when there is no usable range data.
    pub fn canonical_range(&self) -> Option<u32> {
        self.range
            .as_ref()
            .and_then(|range| canonical_feet(range.value, &range.units))
    }

    /// Counts toward prepared-spell statistics.
    pub fn is_countable(&self) -> bool {
        !self.is_granted && !self.is_always_prepared
    }

    /// Decode one host record, normalizing enum ids through the vocabulary.
    pub fn from_json(value: JsonValue, vocabulary: &dyn SpellVocabulary) -> Result<Self, CorpusError> {
        let record_id = value
            .get("id")
            .and_then(JsonValue::as_str)
            .unwrap_or("<unknown>")
            .to_string();

        for field in ["id", "name"] {
            let present = value
                .get(field)
                .and_then(JsonValue::as_str)
                .is_some_and(|s| !s.trim().is_empty());
            if !present {
                return Err(CorpusError::MissingField {
                    record: record_id,
                    field,
                });
            }
        }

        let mut record: SpellRecord =
            serde_json::from_value(value).map_err(|e| CorpusError::InvalidRecord {
                record: record_id.clone(),
                reason: e.to_string(),
            })?;

        if let Some(level) = record.level {
            if level > 9 {
                return Err(CorpusError::InvalidRecord {
                    record: record_id,
                    reason: format!("level {level} outside 0-9"),
                });
            }
        }

        record.normalize(vocabulary);
        Ok(record)
    }

    /// Rewrite enum ids to their canonical spellings.
    pub fn normalize(&mut self, vocabulary: &dyn SpellVocabulary) {
        if let Some(school) = self.school.take() {
            self.school = Some(
                vocabulary
                    .normalize_school(&school)
                    .map(str::to_string)
                    .unwrap_or_else(|| school.to_ascii_lowercase()),
            );
        }
        if let Some(activation) = self.activation.as_mut() {
            activation.kind = vocabulary
                .normalize_activation(&activation.kind)
                .map(str::to_string)
                .unwrap_or_else(|| activation.kind.to_ascii_lowercase());
            activation.value = activation.value.max(1);
        }
        // Units the host does not list carry no comparable range.
        if let Some(range) = self.range.as_mut() {
            range.units = vocabulary
                .normalize_range_unit(&range.units)
                .map(str::to_string)
                .unwrap_or_default();
        }
        if let Some(save) = self.save.as_mut() {
            if let Some(full) = vocabulary.normalize_ability(&save.ability) {
                save.ability = full.to_string();
            }
        }
        self.damage_types = self.damage_types.iter().map(|d| d.to_ascii_lowercase()).collect();
        self.conditions = self.conditions.iter().map(|c| c.to_ascii_lowercase()).collect();
    }
}

// ============================================================================
// Corpus ingestion
// ============================================================================

/// Records decoded from a corpus, with per-record failures kept aside.
#[derive(Debug, Default)]
pub struct CorpusLoad {
    pub records: Vec<SpellRecord>,
    pub errors: Vec<CorpusError>,
}

/// Decode a host corpus. A bad record never aborts the pass.
pub fn load_corpus<I>(values: I, vocabulary: &dyn SpellVocabulary) -> CorpusLoad
where
    I: IntoIterator<Item = JsonValue>,
{
    let mut load = CorpusLoad::default();
    for value in values {
        match SpellRecord::from_json(value, vocabulary) {
            Ok(record) => load.records.push(record),
            Err(e) => {
                warn!(error = %e, "Skipping spell record");
                load.errors.push(e);
            }
        }
    }
    load
}
