//! Test Fixtures
//!
//! Small hand-built spell corpora covering the fields the filter pipeline
//! and the advanced query language look at.

use std::sync::Arc;

use crate::core::spell_search::record::SpellRecord;
use crate::core::spell_search::session::{SearchSession, SessionOptions};
use crate::core::spell_search::settings::MemorySettings;

// =============================================================================
// Spell Fixtures
// =============================================================================

pub fn fireball() -> SpellRecord {
    SpellRecord::new("fireball", "Fireball")
        .with_level(3)
        .with_school("evocation")
        .with_activation("action", 1)
        .with_range(150, "ft")
        .with_save("dexterity")
        .with_damage_type("fire")
        .with_source("phb", "Player's Handbook")
        .with_pack("dnd5e.spells", "dnd5e")
}

pub fn bless() -> SpellRecord {
    SpellRecord::new("bless", "Bless")
        .with_level(1)
        .with_school("enchantment")
        .with_activation("action", 1)
        .with_range(30, "ft")
        .with_property("concentration")
        .with_source("phb", "Player's Handbook")
        .with_pack("dnd5e.spells", "dnd5e")
        .prepared()
}

pub fn firebolt() -> SpellRecord {
    SpellRecord::new("firebolt", "Firebolt")
        .with_level(0)
        .with_school("evocation")
        .with_activation("action", 1)
        .with_range(120, "ft")
        .with_damage_type("fire")
}

pub fn fire_bolt() -> SpellRecord {
    SpellRecord::new("fire-bolt", "Fire Bolt")
        .with_level(0)
        .with_school("evocation")
        .with_activation("action", 1)
        .with_range(120, "ft")
        .with_damage_type("fire")
}

pub fn mage_hand() -> SpellRecord {
    SpellRecord::new("mage-hand", "Mage Hand")
        .with_level(0)
        .with_school("conjuration")
        .with_activation("action", 1)
        .with_range(30, "ft")
}

pub fn alarm() -> SpellRecord {
    SpellRecord::new("alarm", "Alarm")
        .with_level(1)
        .with_school("abjuration")
        .with_activation("minute", 1)
        .with_range(30, "ft")
        .with_property("ritual")
        .with_source("xge", "Xanathar's Guide")
        .with_pack("world.homebrew", "world")
        .favorited()
}

/// Every fixture spell, in a stable order.
pub fn sample_corpus() -> Vec<SpellRecord> {
    vec![fireball(), bless(), firebolt(), fire_bolt(), mage_hand(), alarm()]
}

// =============================================================================
// Session Fixtures
// =============================================================================

/// Session over in-memory settings with the sample corpus loaded.
pub fn create_test_session() -> (Arc<MemorySettings>, SearchSession) {
    let settings = Arc::new(MemorySettings::new());
    let mut session = SearchSession::open(settings.clone(), "gm", SessionOptions::default());
    session.set_corpus(sample_corpus());
    (settings, session)
}
