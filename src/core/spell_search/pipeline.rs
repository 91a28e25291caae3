//! Filter Pipeline
//!
//! Narrows a spell corpus through a fixed sequence of stages and groups the
//! survivors by level. The pipeline is pure: state changes it wants (dead
//! source filters) are reported in [`FilterOutcome::healed`] for the caller
//! to apply.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use super::fields::{casting_time_key, parse_boolean, MATERIAL_CONSUMED, MATERIAL_NOT_CONSUMED};
use super::filter_state::{is_active_choice, FilterKey, FilterState};
use super::fuzzy::NameQuery;
use super::query_executor;
use super::query_parser::QueryAst;
use super::record::SpellRecord;
use crate::core::vocabulary::{DnD5eVocabulary, SpellVocabulary};

static DEFAULT_VOCABULARY: DnD5eVocabulary = DnD5eVocabulary;

/// Per-level counts for the grouped result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStats {
    pub visible: usize,
    pub prepared: usize,
    pub countable: usize,
    pub countable_prepared: usize,
}

/// Pipeline output.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome<'a> {
    pub spells: Vec<&'a SpellRecord>,
    pub total_filtered: usize,
    /// Stats keyed by spell level. Records without a level are counted in
    /// `total_filtered` but have no bucket here.
    pub by_level: BTreeMap<u8, LevelStats>,
    /// Filters that matched nothing and were skipped for this pass.
    pub healed: Vec<FilterKey>,
}

impl FilterOutcome<'_> {
    pub fn ids(&self) -> Vec<&str> {
        self.spells.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.spells.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Default "already selected" predicate for list editors.
pub fn is_in_selected_list(record: &SpellRecord, selected: &HashSet<String>) -> bool {
    selected.contains(&record.id)
}

/// One filtering pass over a corpus.
#[derive(Clone, Copy)]
pub struct FilterPipeline<'s> {
    state: &'s FilterState,
    query: Option<&'s QueryAst>,
    selected: Option<&'s HashSet<String>>,
    party_prepared: Option<&'s HashSet<String>>,
    vocabulary: &'s dyn SpellVocabulary,
}

impl fmt::Debug for FilterPipeline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("state", self.state)
            .field("query", &self.query)
            .field("selected", &self.selected.map(HashSet::len))
            .field("party_prepared", &self.party_prepared.map(HashSet::len))
            .finish()
    }
}

impl<'s> FilterPipeline<'s> {
    pub fn new(state: &'s FilterState) -> Self {
        Self {
            state,
            query: None,
            selected: None,
            party_prepared: None,
            vocabulary: &DEFAULT_VOCABULARY,
        }
    }

    /// Catalogs used to normalize dropdown choices. Defaults to D&D 5e.
    pub fn with_vocabulary(mut self, vocabulary: &'s dyn SpellVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Advanced mode: the name stage evaluates `query` instead of the
    /// free-text name filter.
    pub fn with_query(mut self, query: Option<&'s QueryAst>) -> Self {
        self.query = query;
        self
    }

    /// Drop records already present in a list editor's selection.
    pub fn excluding_selected(mut self, selected: &'s HashSet<String>) -> Self {
        self.selected = Some(selected);
        self
    }

    /// Ids of spells prepared by any party member.
    pub fn with_party_prepared(mut self, prepared: &'s HashSet<String>) -> Self {
        self.party_prepared = Some(prepared);
        self
    }

    pub fn run<'a>(&self, corpus: &'a [SpellRecord]) -> FilterOutcome<'a> {
        let state = self.state;

        let mut candidates: Vec<&'a SpellRecord> = match self.selected {
            Some(selected) => corpus
                .iter()
                .filter(|r| !is_in_selected_list(r, selected))
                .collect(),
            None => corpus.iter().collect(),
        };

        let mut healed = Vec::new();
        for (key, choice) in [
            (FilterKey::Source, state.source.as_str()),
            (FilterKey::SpellSource, state.spell_source.as_str()),
        ] {
            if !is_active_choice(choice) || candidates.is_empty() {
                continue;
            }
            let narrowed: Vec<&'a SpellRecord> = candidates
                .iter()
                .copied()
                .filter(|r| source_matches(key, choice, r))
                .collect();
            if narrowed.is_empty() {
                info!(filter = key.as_str(), value = choice, "Source filter matched nothing, resetting");
                healed.push(key);
            } else {
                candidates = narrowed;
            }
        }

        let name_query = NameQuery::parse(&state.name);
        candidates.retain(|r| self.basic(r, &name_query));
        candidates.retain(|r| range_passes(state, r));
        candidates.retain(|r| damage_and_conditions(state, r));
        candidates.retain(|r| self.special(r));

        let by_level = group_by_level(&candidates);
        debug!(
            corpus = corpus.len(),
            visible = candidates.len(),
            healed = healed.len(),
            "Filter pipeline pass"
        );

        FilterOutcome {
            total_filtered: candidates.len(),
            spells: candidates,
            by_level,
            healed,
        }
    }

    fn basic(&self, record: &SpellRecord, name_query: &NameQuery) -> bool {
        let state = self.state;
        let name_ok = match self.query {
            Some(ast) => query_executor::evaluate(ast, record),
            None => name_query.matches(&record.name),
        };
        name_ok
            && (!is_active_choice(&state.level)
                || record
                    .level
                    .is_some_and(|level| state.level.trim() == level.to_string()))
            && (!is_active_choice(&state.school)
                || record
                    .school
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(state.school.trim())))
            && (!is_active_choice(&state.casting_time)
                || match (
                    record.casting_time_key(),
                    casting_time_key(self.vocabulary, &state.casting_time),
                ) {
                    (Some(have), Some(want)) => have.eq_ignore_ascii_case(&want),
                    _ => false,
                })
    }

    fn special(&self, record: &SpellRecord) -> bool {
        let state = self.state;
        tri_state(&state.requires_save).map_or(true, |b| record.requires_save() == b)
            && tri_state(&state.concentration).map_or(true, |b| record.requires_concentration() == b)
            && material_passes(&state.material_components, record)
            && (!state.favorited || record.is_favorited)
            && (!state.ritual || record.is_ritual())
            && (!state.prepared || record.is_prepared)
            && (!state.prepared_by_party
                || self
                    .party_prepared
                    .is_some_and(|ids| ids.contains(&record.id)))
    }
}

fn source_matches(key: FilterKey, choice: &str, record: &SpellRecord) -> bool {
    let choice = choice.trim();
    let candidates = match key {
        FilterKey::Source => [record.source_id.as_deref(), record.source_label.as_deref()],
        _ => [record.pack_name.as_deref(), record.package_name.as_deref()],
    };
    candidates
        .into_iter()
        .flatten()
        .any(|value| value.eq_ignore_ascii_case(choice))
}

fn range_passes(state: &FilterState, record: &SpellRecord) -> bool {
    if state.range.is_unbounded() {
        return true;
    }
    record
        .canonical_range()
        .map_or(true, |feet| state.range.contains(feet))
}

fn damage_and_conditions(state: &FilterState, record: &SpellRecord) -> bool {
    (!is_active_choice(&state.damage_type) || record.has_damage_type(state.damage_type.trim()))
        && (!is_active_choice(&state.condition) || record.has_condition(state.condition.trim()))
}

fn tri_state(value: &str) -> Option<bool> {
    if is_active_choice(value) {
        parse_boolean(value)
    } else {
        None
    }
}

fn material_passes(choice: &str, record: &SpellRecord) -> bool {
    let choice = choice.trim();
    if choice.eq_ignore_ascii_case(MATERIAL_CONSUMED) {
        record.has_consumed_materials()
    } else if choice.eq_ignore_ascii_case(MATERIAL_NOT_CONSUMED) {
        !record.has_consumed_materials()
    } else {
        true
    }
}

/// Level-less records are skipped.
fn group_by_level(spells: &[&SpellRecord]) -> BTreeMap<u8, LevelStats> {
    let mut by_level: BTreeMap<u8, LevelStats> = BTreeMap::new();
    for spell in spells {
        let Some(level) = spell.level else {
            continue;
        };
        let stats = by_level.entry(level).or_default();
        stats.visible += 1;
        if spell.is_prepared {
            stats.prepared += 1;
        }
        if spell.is_countable() {
            stats.countable += 1;
            if spell.is_prepared {
                stats.countable_prepared += 1;
            }
        }
    }
    by_level
}
