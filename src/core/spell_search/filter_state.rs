//! Filter State
//!
//! The current value of every recognized filter, plus a snapshot cache with
//! a short TTL that absorbs repeated reads during a render pass.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::StateError;
use super::range_units::RangeBounds;

/// Default snapshot TTL (1 second).
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_millis(1000);

/// Dropdown value meaning "no filter" for the source dropdowns.
pub const SOURCE_ALL: &str = "all";

// ============================================================================
// Keys and values
// ============================================================================

/// Addressable filter value. `range` decomposes into `minRange`/`maxRange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKey {
    Name,
    Level,
    School,
    CastingTime,
    MinRange,
    MaxRange,
    DamageType,
    Condition,
    RequiresSave,
    Concentration,
    MaterialComponents,
    Source,
    SpellSource,
    Favorited,
    PreparedByParty,
    Prepared,
    Ritual,
}

impl FilterKey {
    pub const ALL: [FilterKey; 17] = [
        FilterKey::Name,
        FilterKey::Level,
        FilterKey::School,
        FilterKey::CastingTime,
        FilterKey::MinRange,
        FilterKey::MaxRange,
        FilterKey::DamageType,
        FilterKey::Condition,
        FilterKey::RequiresSave,
        FilterKey::Concentration,
        FilterKey::MaterialComponents,
        FilterKey::Source,
        FilterKey::SpellSource,
        FilterKey::Favorited,
        FilterKey::PreparedByParty,
        FilterKey::Prepared,
        FilterKey::Ritual,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Level => "level",
            Self::School => "school",
            Self::CastingTime => "castingTime",
            Self::MinRange => "minRange",
            Self::MaxRange => "maxRange",
            Self::DamageType => "damageType",
            Self::Condition => "condition",
            Self::RequiresSave => "requiresSave",
            Self::Concentration => "concentration",
            Self::MaterialComponents => "materialComponents",
            Self::Source => "source",
            Self::SpellSource => "spellSource",
            Self::Favorited => "favorited",
            Self::PreparedByParty => "preparedByParty",
            Self::Prepared => "prepared",
            Self::Ritual => "ritual",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == id)
    }
}

/// Typed filter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Flag(bool),
    Bound(Option<u32>),
    Text(String),
}

impl FilterValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

/// Ordered list of filter updates, applied left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    entries: Vec<(FilterKey, FilterValue)>,
}

impl FilterPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: FilterKey, value: FilterValue) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: FilterKey, value: FilterValue) {
        self.entries.push((key, value));
    }

    pub fn get(&self, key: FilterKey) -> Option<&FilterValue> {
        self.entries.iter().rev().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(FilterKey, FilterValue)> {
        self.entries.iter()
    }
}

// ============================================================================
// Filter state
// ============================================================================

/// Current filter values. Empty strings and `false` mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub name: String,
    pub level: String,
    pub school: String,
    pub casting_time: String,
    pub range: RangeBounds,
    pub damage_type: String,
    pub condition: String,
    pub requires_save: String,
    pub concentration: String,
    pub material_components: String,
    pub source: String,
    pub spell_source: String,
    pub favorited: bool,
    pub prepared_by_party: bool,
    pub prepared: bool,
    pub ritual: bool,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no filter narrows the corpus.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Set one value, type-checked against the filter's kind.
    ///
    /// Bounds are validated by [`FilterState::apply_patch`] once the whole
    /// patch has landed, since a patch may move both ends.
    pub fn set(&mut self, key: FilterKey, value: FilterValue) -> Result<(), StateError> {
        let name = key.as_str();
        match key {
            FilterKey::MinRange | FilterKey::MaxRange => {
                let FilterValue::Bound(bound) = value else {
                    return Err(StateError::TypeMismatch {
                        filter: name,
                        expected: "bound",
                    });
                };
                if key == FilterKey::MinRange {
                    self.range.min = bound;
                } else {
                    self.range.max = bound;
                }
            }
            FilterKey::Favorited
            | FilterKey::PreparedByParty
            | FilterKey::Prepared
            | FilterKey::Ritual => {
                let FilterValue::Flag(flag) = value else {
                    return Err(StateError::TypeMismatch {
                        filter: name,
                        expected: "boolean",
                    });
                };
                *self.flag_mut(key) = flag;
            }
            _ => {
                let FilterValue::Text(text) = value else {
                    return Err(StateError::TypeMismatch {
                        filter: name,
                        expected: "text",
                    });
                };
                *self.text_mut(key) = text;
            }
        }
        Ok(())
    }

    /// Set a value by its string id.
    pub fn set_by_id(&mut self, id: &str, value: FilterValue) -> Result<(), StateError> {
        let key = FilterKey::from_id(id).ok_or_else(|| StateError::UnknownFilter(id.to_string()))?;
        self.set(key, value)
    }

    /// Apply every entry of `patch`, then validate the range invariant.
    pub fn apply_patch(&mut self, patch: &FilterPatch) -> Result<(), StateError> {
        let mut next = self.clone();
        for (key, value) in patch.iter() {
            next.set(*key, value.clone())?;
        }
        if let (Some(min), Some(max)) = (next.range.min, next.range.max) {
            if min > max {
                return Err(StateError::InvertedRange { min, max });
            }
        }
        *self = next;
        Ok(())
    }

    /// Read a value back by key.
    pub fn get(&self, key: FilterKey) -> FilterValue {
        match key {
            FilterKey::MinRange => FilterValue::Bound(self.range.min),
            FilterKey::MaxRange => FilterValue::Bound(self.range.max),
            FilterKey::Favorited
            | FilterKey::PreparedByParty
            | FilterKey::Prepared
            | FilterKey::Ritual => FilterValue::Flag(self.flag(key)),
            _ => FilterValue::Text(self.text(key).to_string()),
        }
    }

    fn flag(&self, key: FilterKey) -> bool {
        match key {
            FilterKey::Favorited => self.favorited,
            FilterKey::PreparedByParty => self.prepared_by_party,
            FilterKey::Prepared => self.prepared,
            FilterKey::Ritual => self.ritual,
            _ => false,
        }
    }

    fn flag_mut(&mut self, key: FilterKey) -> &mut bool {
        match key {
            FilterKey::Favorited => &mut self.favorited,
            FilterKey::PreparedByParty => &mut self.prepared_by_party,
            FilterKey::Prepared => &mut self.prepared,
            _ => &mut self.ritual,
        }
    }

    fn text(&self, key: FilterKey) -> &str {
        match key {
            FilterKey::Name => &self.name,
            FilterKey::Level => &self.level,
            FilterKey::School => &self.school,
            FilterKey::CastingTime => &self.casting_time,
            FilterKey::DamageType => &self.damage_type,
            FilterKey::Condition => &self.condition,
            FilterKey::RequiresSave => &self.requires_save,
            FilterKey::Concentration => &self.concentration,
            FilterKey::MaterialComponents => &self.material_components,
            FilterKey::Source => &self.source,
            FilterKey::SpellSource => &self.spell_source,
            _ => "",
        }
    }

    fn text_mut(&mut self, key: FilterKey) -> &mut String {
        match key {
            FilterKey::Name => &mut self.name,
            FilterKey::Level => &mut self.level,
            FilterKey::School => &mut self.school,
            FilterKey::CastingTime => &mut self.casting_time,
            FilterKey::DamageType => &mut self.damage_type,
            FilterKey::Condition => &mut self.condition,
            FilterKey::RequiresSave => &mut self.requires_save,
            FilterKey::Concentration => &mut self.concentration,
            FilterKey::MaterialComponents => &mut self.material_components,
            FilterKey::Source => &mut self.source,
            _ => &mut self.spell_source,
        }
    }
}

/// Whether a dropdown value filters anything.
pub(crate) fn is_active_choice(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.eq_ignore_ascii_case(SOURCE_ALL)
}

// ============================================================================
// Store with snapshot cache
// ============================================================================

/// Owns the filter state and serves cached snapshots.
#[derive(Debug)]
pub struct FilterStateStore {
    state: FilterState,
    ttl: Duration,
    snapshot: Option<(Instant, Arc<FilterState>)>,
}

impl Default for FilterStateStore {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_TTL)
    }
}

impl FilterStateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: FilterState::default(),
            ttl,
            snapshot: None,
        }
    }

    /// Current snapshot, rebuilt when older than the TTL.
    pub fn snapshot(&mut self) -> Arc<FilterState> {
        self.snapshot_at(Instant::now())
    }

    /// Snapshot as of `now`.
    pub fn snapshot_at(&mut self, now: Instant) -> Arc<FilterState> {
        if let Some((taken_at, snapshot)) = &self.snapshot {
            if now.saturating_duration_since(*taken_at) < self.ttl {
                return Arc::clone(snapshot);
            }
        }
        let fresh = Arc::new(self.state.clone());
        self.snapshot = Some((now, Arc::clone(&fresh)));
        fresh
    }

    /// Force the next snapshot to rebuild.
    pub fn invalidate(&mut self) {
        self.snapshot = None;
    }

    /// Live state, bypassing the cache.
    pub fn current(&self) -> &FilterState {
        &self.state
    }

    /// Mutate the state; the snapshot is invalidated.
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&mut FilterState),
    {
        f(&mut self.state);
        self.invalidate();
    }

    pub fn set(&mut self, key: FilterKey, value: FilterValue) -> Result<(), StateError> {
        self.merge_partial(&FilterPatch::new().set(key, value))
    }

    /// Apply an executor-derived patch.
    pub fn merge_partial(&mut self, patch: &FilterPatch) -> Result<(), StateError> {
        self.state.apply_patch(patch)?;
        debug!(entries = patch.len(), "Merged filter patch");
        self.invalidate();
        Ok(())
    }

    /// Clear every filter.
    pub fn reset(&mut self) {
        self.state = FilterState::default();
        self.invalidate();
    }
}
