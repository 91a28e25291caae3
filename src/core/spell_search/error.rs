//! Spell Search Error Types
//!
//! Error kinds for query parsing, filter configuration, corpus ingestion,
//! filter state updates and settings I/O.

use thiserror::Error;

use super::fields::FieldId;

/// Advanced query parse errors.
///
/// Parsing never panics; every failure surfaces as one of these variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Query does not start with the advanced prefix '{prefix}'")]
    NotAdvanced { prefix: char },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid boolean for {field}: '{value}' (expected TRUE, FALSE, YES or NO)")]
    InvalidBoolean { field: FieldId, value: String },

    #[error("Invalid value for {field}: '{value}'")]
    InvalidValue { field: FieldId, value: String },

    #[error("Invalid range: '{0}'")]
    InvalidRange(String),

    #[error("Malformed query: {0}")]
    Malformed(String),
}

/// Filter configuration errors. Always self-healed by the config store.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Stored filter configuration is corrupt: {0}")]
    Corrupt(String),

    #[error("Stored filter configuration uses a legacy shape")]
    LegacyShape,

    #[error("Invalid advanced search prefix: '{0}' (must be a single non-whitespace character)")]
    InvalidPrefix(String),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}

/// Per-record corpus ingestion errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorpusError {
    #[error("Spell record {record} is missing required field '{field}'")]
    MissingField { record: String, field: &'static str },

    #[error("Spell record {record} is invalid: {reason}")]
    InvalidRecord { record: String, reason: String },
}

/// Filter state update errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    #[error("Filter {filter} expects a {expected} value")]
    TypeMismatch {
        filter: &'static str,
        expected: &'static str,
    },

    #[error("Range minimum {min} exceeds maximum {max}")]
    InvertedRange { min: u32, max: u32 },
}

/// Settings backend errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Settings backend error: {0}")]
    Backend(String),
}

/// Crate-level error for spell search operations.
#[derive(Error, Debug)]
pub enum SpellSearchError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Result type alias for spell search operations
pub type Result<T> = std::result::Result<T, SpellSearchError>;
