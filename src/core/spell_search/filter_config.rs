//! Filter Config Store
//!
//! Which filters exist, in what order, and whether they are enabled. The
//! persisted list is repaired on every read: legacy shapes are rewritten,
//! older versions migrated, missing defaults re-inserted and orders
//! reassigned. Nothing here fails outward; problems self-heal with a warning.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use super::error::ConfigError;
use super::settings::{SettingsStore, KEY_FILTER_CONFIGURATION};

/// Version of the built-in descriptor list.
pub const CURRENT_CONFIG_VERSION: &str = "0.10.0";

/// Order of the leading `name` filter.
pub const NAME_ORDER: u32 = 10;

/// First order of the trailing block.
pub const TRAILING_ORDER_BASE: u32 = 1000;

const ORDER_STEP: u32 = 10;

const UNSORTABLE_IDS: [&str; 3] = ["name", "prepared", "ritual"];

// ============================================================================
// Descriptor types
// ============================================================================

/// Filter widget type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterType {
    Search,
    Dropdown,
    #[default]
    Checkbox,
    Range,
}

/// One configurable filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    pub order: u32,
    pub enabled: bool,
    pub label: String,
    pub sortable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_aliases: Option<Vec<String>>,
}

impl Default for FilterDescriptor {
    fn default() -> Self {
        Self {
            id: String::new(),
            filter_type: FilterType::default(),
            order: 0,
            enabled: true,
            label: String::new(),
            sortable: true,
            search_aliases: None,
        }
    }
}

impl FilterDescriptor {
    fn builtin(id: &str, filter_type: FilterType, order: u32, enabled: bool, label: &str) -> Self {
        Self {
            id: id.to_string(),
            filter_type,
            order,
            enabled,
            label: format!("SPELLBOOK.Filters.{label}"),
            sortable: !UNSORTABLE_IDS.contains(&id),
            search_aliases: None,
        }
    }
}

/// The built-in descriptor list.
pub fn default_filters() -> Vec<FilterDescriptor> {
    use FilterType::*;
    vec![
        FilterDescriptor::builtin("name", Search, 10, true, "Name"),
        FilterDescriptor::builtin("level", Dropdown, 20, true, "Level"),
        FilterDescriptor::builtin("school", Dropdown, 30, true, "School"),
        FilterDescriptor::builtin("castingTime", Dropdown, 40, true, "CastingTime"),
        FilterDescriptor::builtin("range", Range, 50, true, "Range"),
        FilterDescriptor::builtin("damageType", Dropdown, 60, true, "DamageType"),
        FilterDescriptor::builtin("condition", Dropdown, 70, true, "Condition"),
        FilterDescriptor::builtin("requiresSave", Dropdown, 80, true, "RequiresSave"),
        FilterDescriptor::builtin("concentration", Dropdown, 90, true, "Concentration"),
        FilterDescriptor::builtin("materialComponents", Dropdown, 100, true, "MaterialComponents"),
        FilterDescriptor::builtin("source", Dropdown, 110, true, "Source"),
        FilterDescriptor::builtin("spellSource", Dropdown, 120, true, "SpellSource"),
        FilterDescriptor::builtin("favorited", Checkbox, 130, true, "Favorited"),
        FilterDescriptor::builtin("preparedByParty", Checkbox, 140, false, "PreparedByParty"),
        FilterDescriptor::builtin("prepared", Checkbox, 1000, true, "Prepared"),
        FilterDescriptor::builtin("ritual", Checkbox, 1010, true, "Ritual"),
    ]
}

/// Persisted shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedConfig {
    pub version: String,
    pub filters: Vec<FilterDescriptor>,
}

// ============================================================================
// Versions
// ============================================================================

/// Parse "0.10.0" or "v0.10.0" into (major, minor, patch).
pub fn parse_version(v: &str) -> Option<(u32, u32, u32)> {
    let v = v.trim().trim_start_matches('v');
    let parts: Vec<&str> = v.split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    Some((
        parts[0].parse().ok()?,
        parts[1].parse().ok()?,
        parts[2].parse().ok()?,
    ))
}

/// Whether `stored` predates `current`. Unparseable versions count as older.
pub fn is_older(stored: &str, current: &str) -> bool {
    match (parse_version(stored), parse_version(current)) {
        (Some(s), Some(c)) => s < c,
        (None, _) => true,
        (Some(_), None) => false,
    }
}

// ============================================================================
// Integrity
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Placement {
    Leading,
    Sortable,
    Trailing,
    Unknown,
}

fn placement(id: &str, defaults: &[FilterDescriptor]) -> Placement {
    match id {
        "name" => Placement::Leading,
        "prepared" | "ritual" => Placement::Trailing,
        _ if defaults.iter().any(|d| d.id == id) => Placement::Sortable,
        _ => Placement::Unknown,
    }
}

/// Repair a descriptor list. Idempotent.
///
/// Invalid entries (empty or duplicate id) are dropped, missing defaults
/// are re-inserted at their default order, known entries are sorted by
/// order (name first, fixed trailing entries last) and unknown entries are
/// kept at the tail in their original relative order.
pub fn ensure_integrity(filters: Vec<FilterDescriptor>) -> Vec<FilterDescriptor> {
    let defaults = default_filters();
    let mut seen = HashSet::new();
    let mut known = Vec::new();
    let mut unknown = Vec::new();

    for mut filter in filters {
        let id = filter.id.trim().to_string();
        if id.is_empty() || !seen.insert(id.clone()) {
            debug!(id = %id, "Dropping invalid filter descriptor");
            continue;
        }
        filter.id = id;
        match defaults.iter().find(|d| d.id == filter.id) {
            Some(default) => {
                filter.filter_type = default.filter_type;
                filter.sortable = default.sortable;
                known.push(filter);
            }
            None => unknown.push(filter),
        }
    }

    for default in &defaults {
        if !seen.contains(&default.id) {
            debug!(id = %default.id, "Re-inserting missing default filter");
            known.push(default.clone());
        }
    }

    known.sort_by_key(|f| (placement(&f.id, &defaults), f.order));
    known.extend(unknown);
    known
}

/// Assign canonical orders to a repaired list.
///
/// `name` gets 10, sortable entries 20, 30, ... and the trailing block
/// (fixed entries, then unknown ones) 1000 + 10k.
pub fn assign_orders(mut filters: Vec<FilterDescriptor>) -> Vec<FilterDescriptor> {
    let defaults = default_filters();
    let mut sortable = 0;
    let mut trailing = 0;
    for filter in &mut filters {
        filter.order = match placement(&filter.id, &defaults) {
            Placement::Leading => NAME_ORDER,
            Placement::Sortable => {
                sortable += 1;
                NAME_ORDER + sortable * ORDER_STEP
            }
            Placement::Trailing | Placement::Unknown => {
                let order = TRAILING_ORDER_BASE + trailing * ORDER_STEP;
                trailing += 1;
                order
            }
        };
    }
    filters
}

/// Refresh built-in metadata on descriptors persisted by an older version.
///
/// User choices (enabled, order) survive.
pub fn migrate(filters: Vec<FilterDescriptor>) -> Vec<FilterDescriptor> {
    let defaults = default_filters();
    filters
        .into_iter()
        .map(|mut filter| {
            if let Some(default) = defaults.iter().find(|d| d.id == filter.id) {
                filter.filter_type = default.filter_type;
                filter.label = default.label.clone();
                filter.sortable = default.sortable;
            }
            filter
        })
        .collect()
}

// ============================================================================
// Store
// ============================================================================

/// Outcome of a load, with every self-healed problem.
#[derive(Debug)]
pub struct ConfigLoad {
    pub filters: Vec<FilterDescriptor>,
    pub issues: Vec<ConfigError>,
}

/// Loads, repairs and persists the filter descriptor list.
#[derive(Clone)]
pub struct FilterConfigStore {
    settings: Arc<dyn SettingsStore>,
}

impl FilterConfigStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    /// Load the repaired descriptor list.
    pub fn load(&self) -> Vec<FilterDescriptor> {
        self.load_checked().filters
    }

    /// Load, reporting what had to be healed.
    pub fn load_checked(&self) -> ConfigLoad {
        let mut issues = Vec::new();
        let stored = match self.settings.get(KEY_FILTER_CONFIGURATION) {
            Ok(stored) => stored,
            Err(e) => {
                let e = ConfigError::from(e);
                warn!(error = %e, "Failed to read filter configuration, using defaults");
                issues.push(e);
                return ConfigLoad {
                    filters: assign_orders(default_filters()),
                    issues,
                };
            }
        };

        let Some(stored) = stored else {
            return ConfigLoad {
                filters: assign_orders(default_filters()),
                issues,
            };
        };

        let (filters, rewrite) = match decode(stored) {
            Ok(Decoded::Current(filters)) => (filters, false),
            Ok(Decoded::Newer { version, filters }) => {
                info!(stored_version = %version, current_version = CURRENT_CONFIG_VERSION, "Filter configuration is newer than this build");
                (filters, false)
            }
            Ok(Decoded::Older { version, filters }) => {
                info!(stored_version = %version, target_version = CURRENT_CONFIG_VERSION, "Migrating filter configuration");
                (migrate(filters), true)
            }
            Ok(Decoded::Legacy(filters)) => {
                let e = ConfigError::LegacyShape;
                warn!(error = %e, "Rewriting filter configuration");
                issues.push(e);
                (migrate(filters), true)
            }
            Err(e) => {
                warn!(error = %e, "Filter configuration unreadable, restoring defaults");
                issues.push(e);
                (default_filters(), true)
            }
        };

        let filters = assign_orders(ensure_integrity(filters));
        if rewrite {
            if let Err(e) = self.persist(&filters) {
                warn!(error = %e, "Failed to rewrite filter configuration");
                issues.push(e);
            }
        }
        ConfigLoad { filters, issues }
    }

    /// Persist a descriptor list at the current version, with canonical orders.
    pub fn save(&self, filters: Vec<FilterDescriptor>) -> Result<Vec<FilterDescriptor>, ConfigError> {
        let filters = assign_orders(ensure_integrity(filters));
        self.persist(&filters)?;
        Ok(filters)
    }

    /// Restore and persist the built-in defaults.
    pub fn reset(&self) -> Result<Vec<FilterDescriptor>, ConfigError> {
        let filters = default_filters();
        self.persist(&filters)?;
        info!(version = CURRENT_CONFIG_VERSION, "Reset filter configuration");
        Ok(filters)
    }

    fn persist(&self, filters: &[FilterDescriptor]) -> Result<(), ConfigError> {
        let config = PersistedConfig {
            version: CURRENT_CONFIG_VERSION.to_string(),
            filters: filters.to_vec(),
        };
        let value = serde_json::to_value(&config)
            .map_err(|e| ConfigError::Corrupt(e.to_string()))?;
        self.settings.set(KEY_FILTER_CONFIGURATION, value)?;
        Ok(())
    }
}

enum Decoded {
    Current(Vec<FilterDescriptor>),
    Newer {
        version: String,
        filters: Vec<FilterDescriptor>,
    },
    Older {
        version: String,
        filters: Vec<FilterDescriptor>,
    },
    Legacy(Vec<FilterDescriptor>),
}

fn decode(stored: JsonValue) -> Result<Decoded, ConfigError> {
    match stored {
        JsonValue::Array(entries) => Ok(Decoded::Legacy(decode_entries(entries))),
        JsonValue::Object(mut object) => {
            let entries = match object.remove("filters") {
                Some(JsonValue::Array(entries)) => entries,
                Some(_) => return Err(ConfigError::Corrupt("filters is not an array".to_string())),
                None => return Err(ConfigError::Corrupt("missing filters".to_string())),
            };
            let filters = decode_entries(entries);
            match object.get("version").and_then(JsonValue::as_str) {
                None => Ok(Decoded::Legacy(filters)),
                Some(version) if is_older(version, CURRENT_CONFIG_VERSION) => Ok(Decoded::Older {
                    version: version.to_string(),
                    filters,
                }),
                Some(version) if is_older(CURRENT_CONFIG_VERSION, version) => Ok(Decoded::Newer {
                    version: version.to_string(),
                    filters,
                }),
                Some(_) => Ok(Decoded::Current(filters)),
            }
        }
        other => Err(ConfigError::Corrupt(format!("unexpected {other}"))),
    }
}

fn decode_entries(entries: Vec<JsonValue>) -> Vec<FilterDescriptor> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<FilterDescriptor>(entry) {
            Ok(filter) => Some(filter),
            Err(e) => {
                debug!(error = %e, "Dropping undecodable filter descriptor");
                None
            }
        })
        .collect()
}
