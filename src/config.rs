use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::spell_search::query_parser::{DEFAULT_ADVANCED_PREFIX, DEFAULT_PARSE_CACHE_CAPACITY};
use crate::core::spell_search::settings::validate_prefix;
use crate::core::spell_search::suggestions::{
    EngineTiming, MAX_NAME_SUGGESTIONS, MIN_FUZZY_CHARS,
};
use crate::core::spell_search::SessionOptions;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub search: SearchConfig,
    pub data: DataConfig,
    pub logging: LoggingConfig,
}

/// Spell search tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Single character that marks an advanced query.
    pub advanced_prefix: String,
    pub standard_debounce_ms: u64,
    pub advanced_debounce_ms: u64,
    /// Repeat selections of the same suggestion inside this window are ignored.
    pub duplicate_selection_window_ms: u64,
    pub recent_limit: usize,
    pub snapshot_ttl_ms: u64,
    pub parse_cache_capacity: usize,
    pub max_name_suggestions: usize,
    pub min_fuzzy_chars: usize,
    /// Render ranges in meters/kilometers.
    pub metric: bool,
}

/// Data directory configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory.
    pub data_dir: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    /// Also write JSON logs to a daily rolling file.
    pub file: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            advanced_prefix: DEFAULT_ADVANCED_PREFIX.to_string(),
            standard_debounce_ms: 800,
            advanced_debounce_ms: 150,
            duplicate_selection_window_ms: 500,
            recent_limit: 8,
            snapshot_ttl_ms: 1000,
            parse_cache_capacity: DEFAULT_PARSE_CACHE_CAPACITY,
            max_name_suggestions: MAX_NAME_SUGGESTIONS,
            min_fuzzy_chars: MIN_FUZZY_CHARS,
            metric: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
        }
    }
}

impl SearchConfig {
    /// Configured prefix, or `^` when the setting is not a single
    /// non-whitespace character.
    pub fn prefix(&self) -> char {
        match validate_prefix(&self.advanced_prefix) {
            Ok(prefix) => prefix,
            Err(e) => {
                log::warn!("{e}, using '{DEFAULT_ADVANCED_PREFIX}'");
                DEFAULT_ADVANCED_PREFIX
            }
        }
    }

    pub fn timing(&self) -> EngineTiming {
        EngineTiming {
            standard_debounce: Duration::from_millis(self.standard_debounce_ms),
            advanced_debounce: Duration::from_millis(self.advanced_debounce_ms),
            duplicate_window: Duration::from_millis(self.duplicate_selection_window_ms),
            min_fuzzy_chars: self.min_fuzzy_chars.max(1),
            max_name_suggestions: self.max_name_suggestions,
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            prefix: self.prefix(),
            timing: self.timing(),
            recent_limit: self.recent_limit,
            snapshot_ttl: Duration::from_millis(self.snapshot_ttl_ms),
            parse_cache_capacity: self.parse_cache_capacity,
            metric: self.metric,
        }
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/spellbook/config.toml`.
    /// Returns `Default` if the file is missing or unparseable.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> Self {
        match std::fs::read_to_string(config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse config at {}: {e}, using defaults",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!(
                    "No config file at {}, using defaults",
                    config_path.display()
                );
                Self::default()
            }
        }
    }

    /// Resolved data directory (override or XDG default).
    pub fn data_dir(&self) -> PathBuf {
        self.data.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("spellbook"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    /// Default location of the JSON settings file.
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir().join("settings.json")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("spellbook").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
