/// Spellbook - Spell Search & Filter Core
///
/// Library powering an in-app spell browser: advanced field queries,
/// fuzzy name search, a staged filter pipeline with per-level statistics,
/// a versioned filter configuration store, and typeahead suggestions.

pub mod config;
pub mod core;

#[cfg(test)]
mod tests;

pub use crate::core::spell_search::{
    FieldId, FieldRegistry, FilterConfigStore, FilterDescriptor, FilterOutcome, FilterPipeline,
    FilterState, FilterStateStore, QueryAst, QueryParser, SearchSession, SpellRecord,
    SpellSearchError, SuggestionEngine,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
