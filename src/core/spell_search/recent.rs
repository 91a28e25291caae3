//! Recent Searches
//!
//! Most-recently-used list of committed queries, persisted per viewer.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::warn;

use super::error::SettingsError;
use super::settings::{recent_searches_key, SettingsStore};

/// Default number of remembered searches.
pub const DEFAULT_RECENT_LIMIT: usize = 8;

/// Unique, MRU-first list of raw query strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentSearches {
    entries: Vec<String>,
    limit: usize,
}

impl Default for RecentSearches {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_LIMIT)
    }
}

impl RecentSearches {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Rebuild from persisted entries, re-applying the list invariants.
    pub fn from_entries<I>(entries: I, limit: usize) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut recent = Self::new(limit);
        let entries: Vec<String> = entries.into_iter().collect();
        for entry in entries.into_iter().rev() {
            recent.add(&entry);
        }
        recent
    }

    /// Move `query` to the head. Returns false for blank input.
    pub fn add(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }
        self.entries.retain(|entry| entry != query);
        self.entries.insert(0, query.to_string());
        self.entries.truncate(self.limit);
        true
    }

    /// Remove `query`. Returns whether it was present.
    pub fn remove(&mut self, query: &str) -> bool {
        let query = query.trim();
        let before = self.entries.len();
        self.entries.retain(|entry| entry != query);
        self.entries.len() != before
    }

    pub fn list(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Recent searches bound to one viewer's settings key.
pub struct RecentSearchStore {
    settings: Arc<dyn SettingsStore>,
    key: String,
    recent: RecentSearches,
}

impl RecentSearchStore {
    /// Load the viewer's list. Unreadable data starts an empty list.
    pub fn load(settings: Arc<dyn SettingsStore>, viewer: &str, limit: usize) -> Self {
        let key = recent_searches_key(viewer);
        let recent = match settings.get(&key) {
            Ok(Some(JsonValue::Array(values))) => RecentSearches::from_entries(
                values
                    .into_iter()
                    .filter_map(|v| v.as_str().map(str::to_string)),
                limit,
            ),
            Ok(Some(other)) => {
                warn!(key = %key, value = %other, "Ignoring malformed recent searches");
                RecentSearches::new(limit)
            }
            Ok(None) => RecentSearches::new(limit),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read recent searches");
                RecentSearches::new(limit)
            }
        };
        Self {
            settings,
            key,
            recent,
        }
    }

    pub fn add(&mut self, query: &str) -> Result<(), SettingsError> {
        if self.recent.add(query) {
            self.persist()?;
        }
        Ok(())
    }

    pub fn remove(&mut self, query: &str) -> Result<(), SettingsError> {
        if self.recent.remove(query) {
            self.persist()?;
        }
        Ok(())
    }

    pub fn list(&self) -> &[String] {
        self.recent.list()
    }

    fn persist(&self) -> Result<(), SettingsError> {
        self.settings
            .set(&self.key, serde_json::to_value(self.recent.list())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spell_search::settings::{MemorySettings, MockSettingsStore};
    use serde_json::json;

    #[test]
    fn test_add_is_mru_unique() {
        let mut recent = RecentSearches::default();
        recent.add("fire");
        recent.add("^level:3");
        recent.add(" fire ");
        assert_eq!(recent.list(), &["fire".to_string(), "^level:3".to_string()]);
        assert!(!recent.add("   "));
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn test_add_truncates_to_limit() {
        let mut recent = RecentSearches::default();
        for i in 0..12 {
            recent.add(&format!("query {i}"));
        }
        assert_eq!(recent.len(), DEFAULT_RECENT_LIMIT);
        assert_eq!(recent.list()[0], "query 11");
        assert_eq!(recent.list()[7], "query 4");
    }

    #[test]
    fn test_remove() {
        let mut recent = RecentSearches::default();
        recent.add("bless");
        assert!(recent.remove("bless"));
        assert!(!recent.remove("bless"));
        assert!(recent.is_empty());
    }

    #[test]
    fn test_from_entries_keeps_order_and_dedups() {
        let recent = RecentSearches::from_entries(
            vec!["a".to_string(), "b".to_string(), "a".to_string()],
            8,
        );
        assert_eq!(recent.list(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_store_persists_per_viewer() {
        let settings = Arc::new(MemorySettings::new());
        let mut store = RecentSearchStore::load(settings.clone(), "gm", 8);
        store.add("fireball").unwrap();
        store.add("^level:1").unwrap();

        assert_eq!(
            settings.get("recentSearches.gm").unwrap(),
            Some(json!(["^level:1", "fireball"]))
        );

        let reloaded = RecentSearchStore::load(settings.clone(), "gm", 8);
        assert_eq!(reloaded.list(), store.list());
        let other = RecentSearchStore::load(settings, "player", 8);
        assert!(other.list().is_empty());
    }

    #[test]
    fn test_store_tolerates_read_failure() {
        let mut mock = MockSettingsStore::new();
        mock.expect_get()
            .returning(|_| Err(SettingsError::Backend("down".to_string())));
        let store = RecentSearchStore::load(Arc::new(mock), "gm", 8);
        assert!(store.list().is_empty());
    }
}
