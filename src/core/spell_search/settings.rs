//! Settings I/O
//!
//! Key-value settings storage behind the spell search core. Values are JSON;
//! the host owns the backend. An in-memory store and an atomically written
//! JSON file store are provided.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::error::{ConfigError, SettingsError};

/// Persisted filter descriptor list.
pub const KEY_FILTER_CONFIGURATION: &str = "filterConfiguration";

/// Advanced-search prefix character.
pub const KEY_ADVANCED_PREFIX: &str = "advancedSearchPrefix";

/// Row detail visibility bitset.
pub const KEY_DETAILS_VISIBILITY: &str = "spellDetailsVisibility";

const KEY_RECENT_SEARCHES: &str = "recentSearches";

/// Per-viewer recent searches key.
pub fn recent_searches_key(viewer: &str) -> String {
    format!("{KEY_RECENT_SEARCHES}.{viewer}")
}

/// Settings backend.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<JsonValue>, SettingsError>;
    fn set(&self, key: &str, value: JsonValue) -> Result<(), SettingsError>;
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local settings, mostly for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, JsonValue>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Result<Option<JsonValue>, SettingsError> {
        let values = self
            .values
            .read()
            .map_err(|e| SettingsError::Backend(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: JsonValue) -> Result<(), SettingsError> {
        let mut values = self
            .values
            .write()
            .map_err(|e| SettingsError::Backend(e.to_string()))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

// ============================================================================
// JSON file backend
// ============================================================================

/// Settings persisted as one JSON object on disk.
///
/// Every write replaces the file atomically via a temp file in the same
/// directory.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: RwLock<HashMap<String, JsonValue>>,
}

impl JsonFileSettings {
    /// Open (or lazily create) the settings file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            HashMap::new()
        };
        debug!(path = %path.display(), keys = values.len(), "Opened settings file");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_out(&self, values: &HashMap<String, JsonValue>) -> Result<(), SettingsError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut file = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut file, values)?;
        file.flush()?;
        file.persist(&self.path).map_err(|e| SettingsError::Io(e.error))?;
        Ok(())
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: &str) -> Result<Option<JsonValue>, SettingsError> {
        let values = self
            .values
            .read()
            .map_err(|e| SettingsError::Backend(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: JsonValue) -> Result<(), SettingsError> {
        let mut values = self
            .values
            .write()
            .map_err(|e| SettingsError::Backend(e.to_string()))?;
        // Memory only changes once the file is on disk.
        let mut next = values.clone();
        next.insert(key.to_string(), value);
        self.write_out(&next)?;
        *values = next;
        Ok(())
    }
}

// ============================================================================
// Advanced prefix
// ============================================================================

/// Validate a prefix setting: exactly one non-whitespace character.
pub fn validate_prefix(raw: &str) -> Result<char, ConfigError> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_whitespace() => Ok(c),
        _ => Err(ConfigError::InvalidPrefix(raw.to_string())),
    }
}

/// Read the advanced prefix, falling back to `fallback` on any problem.
pub fn load_advanced_prefix(settings: &dyn SettingsStore, fallback: char) -> char {
    let stored = match settings.get(KEY_ADVANCED_PREFIX) {
        Ok(Some(JsonValue::String(raw))) => raw,
        Ok(None) => return fallback,
        Ok(Some(other)) => other.to_string(),
        Err(e) => {
            warn!(error = %e, "Failed to read advanced search prefix, using default");
            return fallback;
        }
    };
    match validate_prefix(&stored) {
        Ok(prefix) => prefix,
        Err(e) => {
            warn!(error = %e, "Ignoring advanced search prefix");
            fallback
        }
    }
}
