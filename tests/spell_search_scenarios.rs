//! End-to-end spell search scenarios through the public API.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tempfile::TempDir;

use spellbook::core::spell_search::{
    apply_to_state, DropdownState, FieldId, FilterConfigStore, FilterKey, FilterPipeline, FilterState,
    FilterValue, JsonFileSettings, MemorySettings, NavKey, QueryParser, SearchSession,
    SessionEvent, SessionOptions, SettingsStore, SpellRecord, SuggestionKind,
    CURRENT_CONFIG_VERSION,
};

fn fireball() -> SpellRecord {
    SpellRecord::new("fireball", "Fireball")
        .with_level(3)
        .with_school("evocation")
        .with_activation("action", 1)
        .with_range(150, "ft")
        .with_damage_type("fire")
}

fn bless() -> SpellRecord {
    SpellRecord::new("bless", "Bless")
        .with_level(1)
        .with_school("enchantment")
}

fn names<'a>(spells: &[&'a SpellRecord]) -> Vec<&'a str> {
    spells.iter().map(|s| s.name.as_str()).collect()
}

#[test]
fn level_filter_selects_bless() {
    let corpus = vec![fireball(), bless()];
    let state = FilterState {
        level: "1".to_string(),
        ..Default::default()
    };

    let outcome = FilterPipeline::new(&state).run(&corpus);
    assert_eq!(names(&outcome.spells), vec!["Bless"]);
    assert_eq!(outcome.by_level[&1].visible, 1);
}

#[test]
fn advanced_query_patches_state_and_filters() {
    let corpus = vec![fireball(), bless()];
    let mut parser = QueryParser::default();
    let ast = parser.parse("^level:3 AND damageType:fire").unwrap();

    let mut state = FilterState::default();
    state.apply_patch(&apply_to_state(&ast)).unwrap();
    assert_eq!(state.level, "3");
    assert_eq!(state.damage_type, "fire");

    let outcome = FilterPipeline::new(&state).with_query(Some(&ast)).run(&corpus);
    assert_eq!(names(&outcome.spells), vec!["Fireball"]);
}

#[test]
fn two_token_query_needs_every_token() {
    let corpus = vec![
        fireball(),
        SpellRecord::new("firebolt", "Firebolt"),
        SpellRecord::new("mage-hand", "Mage Hand"),
    ];
    let state = FilterState {
        name: "fire ball".to_string(),
        ..Default::default()
    };

    let outcome = FilterPipeline::new(&state).run(&corpus);
    assert_eq!(names(&outcome.spells), vec!["Fireball"]);
}

#[test]
fn quoted_phrase_matches_substring_only() {
    let corpus = vec![
        SpellRecord::new("firebolt", "Firebolt"),
        SpellRecord::new("fire-bolt", "Fire Bolt"),
    ];
    let state = FilterState {
        name: "\"fire bolt\"".to_string(),
        ..Default::default()
    };

    let outcome = FilterPipeline::new(&state).run(&corpus);
    assert_eq!(names(&outcome.spells), vec!["Fire Bolt"]);
}

#[test]
fn range_query_canonicalizes_units() {
    let corpus = vec![
        SpellRecord::new("far", "Far").with_range(90, "ft"),
        SpellRecord::new("mile", "Mile").with_range(1, "mi"),
        SpellRecord::new("near", "Near").with_range(45, "ft"),
        SpellRecord::new("unitless", "Unitless").with_range(10, ""),
        SpellRecord::new("none", "None"),
    ];
    let mut parser = QueryParser::default();
    let ast = parser.parse("^range:30-60").unwrap();

    let mut state = FilterState::default();
    state.apply_patch(&apply_to_state(&ast)).unwrap();
    assert_eq!(state.range.min, Some(30));
    assert_eq!(state.range.max, Some(60));

    let outcome = FilterPipeline::new(&state).with_query(Some(&ast)).run(&corpus);
    assert_eq!(outcome.ids(), vec!["near", "unitless", "none"]);
}

#[test]
fn old_config_is_migrated_on_load() {
    let settings = Arc::new(MemorySettings::new());
    settings
        .set(
            "filterConfiguration",
            json!({
                "version": "0.9.0",
                "filters": [
                    {"id": "level", "type": "dropdown", "order": 20, "enabled": false},
                    {"id": "homebrewTag", "type": "checkbox", "order": 5, "enabled": true}
                ]
            }),
        )
        .unwrap();

    let store = FilterConfigStore::new(settings.clone());
    let filters = store.load();

    let name = filters.iter().find(|f| f.id == "name").unwrap();
    assert_eq!(name.order, 10);
    assert_eq!(filters[0].id, "name");

    let level = filters.iter().find(|f| f.id == "level").unwrap();
    assert!(!level.enabled);

    let last = filters.last().unwrap();
    assert_eq!(last.id, "homebrewTag");
    assert!(last.order >= 1000);
    assert_eq!(filters.len(), 17);

    let stored = settings.get("filterConfiguration").unwrap().unwrap();
    assert_eq!(stored["version"], json!(CURRENT_CONFIG_VERSION));
}

#[test]
fn session_survives_reopen_with_file_settings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    let now = Instant::now();

    {
        let settings: Arc<dyn SettingsStore> = Arc::new(JsonFileSettings::open(&path).unwrap());
        let mut session = SearchSession::open(settings, "gm", SessionOptions::default());
        session.set_corpus(vec![fireball(), bless()]);
        session.input("^school:evocation", now);
        assert_eq!(session.key(NavKey::Enter, now), SessionEvent::RerunPipeline);
        assert_eq!(session.results(now).ids(), vec!["fireball"]);
    }

    let settings: Arc<dyn SettingsStore> = Arc::new(JsonFileSettings::open(&path).unwrap());
    let session = SearchSession::open(settings, "gm", SessionOptions::default());
    assert_eq!(session.recent_searches(), &["^school:evocation".to_string()]);
    assert_eq!(session.filters().len(), 16);
}

#[test]
fn advanced_typing_offers_fields_then_values() {
    let settings = Arc::new(MemorySettings::new());
    let mut session = SearchSession::open(settings, "gm", SessionOptions::default());
    session.set_corpus(vec![fireball(), bless()]);
    let start = Instant::now();

    session.input("^", start);
    assert_eq!(
        session.tick(start + Duration::from_millis(150)),
        SessionEvent::SuggestionsUpdated
    );
    assert_eq!(session.dropdown_state(), DropdownState::FieldSelection);
    assert!(session
        .suggestions()
        .iter()
        .any(|s| matches!(s.kind, SuggestionKind::Field { .. })));

    let later = start + Duration::from_secs(1);
    session.input("^level:", later);
    session.tick(later + Duration::from_millis(150));
    assert_eq!(
        session.dropdown_state(),
        DropdownState::ValueSelection {
            field: FieldId::Level
        }
    );
    assert!(session
        .suggestions()
        .iter()
        .any(|s| s.replacement.as_deref() == Some("^level:3")));
}

#[test]
fn selected_spells_and_party_preparation() {
    let settings = Arc::new(MemorySettings::new());
    let mut session = SearchSession::open(settings, "gm", SessionOptions::default());
    session.set_corpus(vec![fireball(), bless()]);
    let now = Instant::now();

    session.set_selected(Some(HashSet::from(["fireball".to_string()])));
    assert_eq!(session.results(now).ids(), vec!["bless"]);

    session.set_selected(None);
    session
        .set_filter(FilterKey::PreparedByParty, FilterValue::Flag(true))
        .unwrap();
    assert!(session.results(now).spells.is_empty());

    session.set_party_prepared(Some(HashSet::from(["fireball".to_string()])));
    assert_eq!(session.results(now).ids(), vec!["fireball"]);
}
