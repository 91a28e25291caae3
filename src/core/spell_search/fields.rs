//! Field Registry
//!
//! The catalog of fields the advanced query language recognizes: aliases,
//! value domains, coercion of raw text into typed values, and the
//! "still typing" test the suggestion engine relies on.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::ParseError;
use super::range_units::RangeBounds;
use crate::core::vocabulary::{DnD5eVocabulary, SpellVocabulary};

/// Accepted boolean spellings.
pub const BOOLEAN_WORDS: [&str; 4] = ["TRUE", "FALSE", "YES", "NO"];

/// Material component filter values.
pub const MATERIAL_CONSUMED: &str = "consumed";
pub const MATERIAL_NOT_CONSUMED: &str = "notConsumed";

// ============================================================================
// Field identity
// ============================================================================

/// Canonical query field after alias resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldId {
    Level,
    School,
    CastingTime,
    Range,
    DamageType,
    Condition,
    RequiresSave,
    Concentration,
    MaterialComponents,
    Prepared,
    Ritual,
    Favorited,
}

impl FieldId {
    /// Every field, in natural display order.
    pub const ALL: [FieldId; 12] = [
        FieldId::Level,
        FieldId::School,
        FieldId::CastingTime,
        FieldId::Range,
        FieldId::DamageType,
        FieldId::Condition,
        FieldId::RequiresSave,
        FieldId::Concentration,
        FieldId::MaterialComponents,
        FieldId::Prepared,
        FieldId::Ritual,
        FieldId::Favorited,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Level => "level",
            Self::School => "school",
            Self::CastingTime => "castingTime",
            Self::Range => "range",
            Self::DamageType => "damageType",
            Self::Condition => "condition",
            Self::RequiresSave => "requiresSave",
            Self::Concentration => "concentration",
            Self::MaterialComponents => "materialComponents",
            Self::Prepared => "prepared",
            Self::Ritual => "ritual",
            Self::Favorited => "favorited",
        }
    }

    /// Alias inserted by field suggestions.
    pub fn primary_alias(self) -> &'static str {
        self.aliases()[0]
    }

    /// All accepted aliases (upper case; matching is case-insensitive).
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Level => &["LEVEL", "LVL"],
            Self::School => &["SCHOOL"],
            Self::CastingTime => &["CASTINGTIME", "CASTING", "CAST", "TIME"],
            Self::Range => &["RANGE", "DISTANCE"],
            Self::DamageType => &["DAMAGE", "DMG", "DAMAGETYPE"],
            Self::Condition => &["CONDITION", "CONDITIONS", "COND"],
            Self::RequiresSave => &["SAVE", "REQUIRESSAVE", "SAVING"],
            Self::Concentration => &["CONCENTRATION", "CONC"],
            Self::MaterialComponents => &["MATERIALS", "MATERIAL", "COMPONENTS", "MATERIALCOMPONENTS"],
            Self::Prepared => &["PREPARED", "PREP"],
            Self::Ritual => &["RITUAL"],
            Self::Favorited => &["FAVORITED", "FAVORITE", "FAV"],
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            Self::Level => ValueKind::Integer,
            Self::Range => ValueKind::Range,
            Self::RequiresSave
            | Self::Concentration
            | Self::Prepared
            | Self::Ritual
            | Self::Favorited => ValueKind::Boolean,
            Self::School
            | Self::CastingTime
            | Self::DamageType
            | Self::Condition
            | Self::MaterialComponents => ValueKind::Enum,
        }
    }

    /// Operator the field's leaves evaluate with.
    pub fn op(self) -> Op {
        match self {
            Self::DamageType | Self::Condition => Op::Has,
            Self::Range => Op::RangeIn,
            _ => Op::Eq,
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value domain of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Enum,
    Boolean,
    Integer,
    Range,
}

/// Leaf operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Op {
    Eq,
    Has,
    RangeIn,
}

/// Typed leaf value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Value {
    Number(u32),
    Enum(String),
    Bool(bool),
    Range(RangeBounds),
}

/// Result of [`FieldRegistry::valid_values`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidValues {
    Enumerated(Vec<String>),
    Unbounded,
}

// ============================================================================
// Registry
// ============================================================================

/// Alias resolution and value coercion for the advanced query language.
pub struct FieldRegistry {
    vocabulary: Box<dyn SpellVocabulary>,
    aliases: HashMap<String, FieldId>,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRegistry")
            .field("aliases", &self.aliases.len())
            .finish()
    }
}

impl FieldRegistry {
    /// Registry over the D&D 5e catalogs.
    pub fn new() -> Self {
        Self::with_vocabulary(Box::new(DnD5eVocabulary))
    }

    /// Registry over host-supplied catalogs.
    pub fn with_vocabulary(vocabulary: Box<dyn SpellVocabulary>) -> Self {
        let mut aliases = HashMap::new();
        for field in FieldId::ALL {
            aliases.insert(field.as_str().to_ascii_uppercase(), field);
            for alias in field.aliases() {
                aliases.insert((*alias).to_string(), field);
            }
        }
        Self { vocabulary, aliases }
    }

    /// Shared handle, as held by the parser and the suggestion engine.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn vocabulary(&self) -> &dyn SpellVocabulary {
        self.vocabulary.as_ref()
    }

    /// Resolve an alias (case-insensitive).
    pub fn field_id(&self, alias: &str) -> Option<FieldId> {
        self.aliases.get(&alias.trim().to_ascii_uppercase()).copied()
    }

    /// Fields whose canonical id or any alias starts with `partial`.
    pub fn fields_matching(&self, partial: &str) -> Vec<FieldId> {
        let partial = partial.trim().to_ascii_uppercase();
        FieldId::ALL
            .into_iter()
            .filter(|field| {
                field.as_str().to_ascii_uppercase().starts_with(&partial)
                    || field.aliases().iter().any(|a| a.starts_with(&partial))
            })
            .collect()
    }

    /// Enumerated members of a field, in natural catalog order.
    pub fn valid_values(&self, field: FieldId) -> ValidValues {
        let values: Vec<String> = match field.kind() {
            ValueKind::Range => return ValidValues::Unbounded,
            ValueKind::Boolean => BOOLEAN_WORDS.iter().map(|w| w.to_string()).collect(),
            ValueKind::Integer => (0..=9).map(|level| level.to_string()).collect(),
            ValueKind::Enum => match field {
                FieldId::School => self
                    .vocabulary
                    .spell_schools()
                    .iter()
                    .map(|(id, _)| id.to_string())
                    .collect(),
                FieldId::CastingTime => self
                    .vocabulary
                    .activation_types()
                    .iter()
                    .map(|t| t.to_string())
                    .collect(),
                FieldId::DamageType => self
                    .vocabulary
                    .damage_types()
                    .iter()
                    .map(|d| d.to_string())
                    .collect(),
                FieldId::Condition => self
                    .vocabulary
                    .conditions()
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
                FieldId::MaterialComponents => {
                    vec![MATERIAL_CONSUMED.to_string(), MATERIAL_NOT_CONSUMED.to_string()]
                }
                _ => Vec::new(),
            },
        };
        ValidValues::Enumerated(values)
    }

    /// Coerce raw query text into a typed value for `field`.
    pub fn coerce(&self, field: FieldId, raw: &str) -> Result<Value, ParseError> {
        let raw = raw.trim();
        let invalid = || ParseError::InvalidValue {
            field,
            value: raw.to_string(),
        };

        match field {
            FieldId::Level => match raw.parse::<u32>() {
                Ok(level) if level <= 9 => Ok(Value::Number(level)),
                _ => Err(invalid()),
            },
            FieldId::School => self
                .vocabulary
                .normalize_school(raw)
                .map(|id| Value::Enum(id.to_string()))
                .ok_or_else(invalid),
            FieldId::CastingTime => casting_time_key(self.vocabulary(), raw)
                .map(Value::Enum)
                .ok_or_else(invalid),
            FieldId::DamageType => find_member(self.vocabulary.damage_types(), raw)
                .map(Value::Enum)
                .ok_or_else(invalid),
            FieldId::Condition => find_member(self.vocabulary.conditions(), raw)
                .map(Value::Enum)
                .ok_or_else(invalid),
            FieldId::MaterialComponents => {
                let normalized = raw.to_ascii_lowercase().replace(['-', '_'], "");
                match normalized.as_str() {
                    "consumed" => Ok(Value::Enum(MATERIAL_CONSUMED.to_string())),
                    "notconsumed" => Ok(Value::Enum(MATERIAL_NOT_CONSUMED.to_string())),
                    _ => Err(invalid()),
                }
            }
            FieldId::RequiresSave
            | FieldId::Concentration
            | FieldId::Prepared
            | FieldId::Ritual
            | FieldId::Favorited => parse_boolean(raw)
                .map(Value::Bool)
                .ok_or_else(|| ParseError::InvalidBoolean {
                    field,
                    value: raw.to_string(),
                }),
            FieldId::Range => parse_range(raw).map(Value::Range),
        }
    }

    /// Whether `partial` is still being typed toward a valid value.
    ///
    /// Booleans accept strict prefixes of TRUE/FALSE/YES/NO; enumerated
    /// fields accept strict prefixes of a member; range text is never
    /// "incomplete" - it either parses or it does not.
    pub fn is_incomplete(&self, field: FieldId, partial: &str) -> bool {
        let partial = partial.trim();
        match field.kind() {
            ValueKind::Range => false,
            _ if partial.is_empty() => true,
            _ if self.coerce(field, partial).is_ok() => false,
            _ => match self.valid_values(field) {
                ValidValues::Enumerated(values) => values
                    .iter()
                    .any(|v| starts_with_ignore_case(v, partial) && !v.eq_ignore_ascii_case(partial)),
                ValidValues::Unbounded => false,
            },
        }
    }

    /// Members of `field` starting with `partial` (case-insensitive).
    pub fn completions(&self, field: FieldId, partial: &str) -> Vec<String> {
        match self.valid_values(field) {
            ValidValues::Enumerated(values) => values
                .into_iter()
                .filter(|v| starts_with_ignore_case(v, partial.trim()))
                .collect(),
            ValidValues::Unbounded => Vec::new(),
        }
    }
}

/// Normalized `type:amount` casting time key; a bare type means amount 1.
pub fn casting_time_key(vocabulary: &dyn SpellVocabulary, raw: &str) -> Option<String> {
    let raw = raw.trim();
    let (kind, amount) = match raw.split_once(':') {
        Some((kind, amount)) => (kind, Some(amount)),
        None => (raw, None),
    };
    let kind = vocabulary.normalize_activation(kind)?;
    let amount = match amount {
        None => 1,
        Some(amount) => match amount.trim().parse::<u32>() {
            Ok(n) if n >= 1 => n,
            _ => return None,
        },
    };
    Some(format!("{kind}:{amount}"))
}

fn find_member(members: &[&str], raw: &str) -> Option<String> {
    members
        .iter()
        .find(|m| m.eq_ignore_ascii_case(raw))
        .map(|m| m.to_string())
}

pub(crate) fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.len() >= prefix.len()
        && value.is_char_boundary(prefix.len())
        && value[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Parse TRUE/FALSE/YES/NO (case-insensitive).
pub fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "TRUE" | "YES" => Some(true),
        "FALSE" | "NO" => Some(false),
        _ => None,
    }
}

/// Parse a range literal: `min-max`, `*-max`, `min-*`, `*` or a bare `min`.
pub fn parse_range(raw: &str) -> Result<RangeBounds, ParseError> {
    let raw = raw.trim();
    let invalid = || ParseError::InvalidRange(raw.to_string());

    let side = |text: &str| -> Result<Option<u32>, ParseError> {
        match text {
            "*" => Ok(None),
            digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                digits.parse::<u32>().map(Some).map_err(|_| invalid())
            }
            _ => Err(invalid()),
        }
    };

    let (min, max) = match raw.split_once('-') {
        Some((lo, hi)) => (side(lo)?, side(hi)?),
        None => (side(raw)?, None),
    };
    RangeBounds::new(min, max).ok_or_else(invalid)
}
