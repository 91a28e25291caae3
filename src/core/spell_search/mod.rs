//! Spell Search Module
//!
//! Search and filtering over a spell corpus: field registry, filter
//! configuration and state, the advanced query language, fuzzy name
//! matching, the filter pipeline, dropdown suggestions and recent searches.

pub mod display;
pub mod error;
pub mod fields;
pub mod filter_config;
pub mod filter_state;
pub mod fuzzy;
pub mod pipeline;
pub mod query_executor;
pub mod query_parser;
pub mod range_units;
pub mod recent;
pub mod record;
pub mod session;
pub mod settings;
pub mod suggestions;

pub use display::{format_range, spell_details, DetailVisibility, SpellDetail};
pub use error::{
    ConfigError, CorpusError, ParseError, Result, SettingsError, SpellSearchError, StateError,
};
pub use fields::{FieldId, FieldRegistry, Op, ValidValues, Value, ValueKind};
pub use filter_config::{
    default_filters, ensure_integrity, ConfigLoad, FilterConfigStore, FilterDescriptor, FilterType,
    CURRENT_CONFIG_VERSION,
};
pub use filter_state::{FilterKey, FilterPatch, FilterState, FilterStateStore, FilterValue};
pub use fuzzy::{name_matches, MatchKind, NameQuery, NameRanker};
pub use pipeline::{is_in_selected_list, FilterOutcome, FilterPipeline, LevelStats};
pub use query_executor::{apply_to_state, evaluate};
pub use query_parser::{FieldExpr, QueryAst, QueryParser};
pub use range_units::{canonical_feet, RangeBounds, RangeUnit};
pub use recent::{RecentSearchStore, RecentSearches};
pub use record::{load_corpus, CorpusLoad, SpellRecord};
pub use session::{SearchSession, SessionEvent, SessionOptions};
pub use settings::{JsonFileSettings, MemorySettings, SettingsStore};
pub use suggestions::{
    CommitMode, CommitRequest, DropdownState, EngineEvent, EngineTiming, NavKey, Suggestion,
    SuggestionEngine, SuggestionKind,
};
