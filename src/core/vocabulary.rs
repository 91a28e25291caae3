//! Game System Vocabularies
//!
//! Defines the `SpellVocabulary` trait - the host's enum catalogs that give
//! the query language its value domains - and the D&D 5e implementation.

// ============================================================================
// Trait
// ============================================================================

/// Enum catalogs consumed by the spell search core.
///
/// Every list is returned in its natural display order; suggestion dropdowns
/// preserve that order.
pub trait SpellVocabulary: Send + Sync {
    /// Spell schools as `(id, abbreviation)` pairs.
    fn spell_schools(&self) -> &[(&str, &str)];

    /// All damage types.
    fn damage_types(&self) -> &[&str];

    /// All conditions a spell can inflict.
    fn conditions(&self) -> &[&str];

    /// Activation (casting time) types.
    fn activation_types(&self) -> &[&str];

    /// Ability score abbreviations and their full names.
    fn ability_abbreviations(&self) -> &[(&str, &str)];

    /// Range unit ids understood by the range service.
    fn range_units(&self) -> &[&str];

    /// Canonical school id for an id or abbreviation.
    fn normalize_school(&self, school: &str) -> Option<&str> {
        let school = school.trim();
        self.spell_schools()
            .iter()
            .find(|(id, abbr)| school.eq_ignore_ascii_case(id) || school.eq_ignore_ascii_case(abbr))
            .map(|(id, _)| *id)
    }

    /// Get the canonical name for an ability score (normalize abbreviations).
    fn normalize_ability(&self, ability: &str) -> Option<&str> {
        let ability_lower = ability.to_lowercase();
        for (abbr, full) in self.ability_abbreviations() {
            if ability_lower == *abbr || ability_lower == *full {
                return Some(full);
            }
        }
        None
    }

    /// Canonical activation type (case-insensitive lookup).
    fn normalize_activation(&self, kind: &str) -> Option<&str> {
        let kind = kind.trim();
        self.activation_types()
            .iter()
            .find(|t| kind.eq_ignore_ascii_case(t))
            .copied()
    }

    /// Canonical range unit id, or `None` when the host has no such unit.
    fn normalize_range_unit(&self, units: &str) -> Option<&str> {
        let units = units.trim();
        self.range_units()
            .iter()
            .find(|u| units.eq_ignore_ascii_case(u))
            .copied()
    }
}

// ============================================================================
// D&D 5e Vocabulary
// ============================================================================

/// D&D 5th Edition vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct DnD5eVocabulary;

impl SpellVocabulary for DnD5eVocabulary {
    fn spell_schools(&self) -> &[(&str, &str)] {
        &[
            ("abjuration", "abj"),
            ("conjuration", "con"),
            ("divination", "div"),
            ("enchantment", "enc"),
            ("evocation", "evo"),
            ("illusion", "ill"),
            ("necromancy", "nec"),
            ("transmutation", "trs"),
        ]
    }

    fn damage_types(&self) -> &[&str] {
        &[
            "acid",
            "bludgeoning",
            "cold",
            "fire",
            "force",
            "lightning",
            "necrotic",
            "piercing",
            "poison",
            "psychic",
            "radiant",
            "slashing",
            "thunder",
        ]
    }

    fn conditions(&self) -> &[&str] {
        &[
            "blinded",
            "charmed",
            "deafened",
            "exhaustion",
            "frightened",
            "grappled",
            "incapacitated",
            "invisible",
            "paralyzed",
            "petrified",
            "poisoned",
            "prone",
            "restrained",
            "stunned",
            "unconscious",
        ]
    }

    fn activation_types(&self) -> &[&str] {
        &["action", "bonus", "reaction", "minute", "hour", "day", "special"]
    }

    fn ability_abbreviations(&self) -> &[(&str, &str)] {
        &[
            ("str", "strength"),
            ("dex", "dexterity"),
            ("con", "constitution"),
            ("int", "intelligence"),
            ("wis", "wisdom"),
            ("cha", "charisma"),
        ]
    }

    fn range_units(&self) -> &[&str] {
        &["self", "touch", "ft", "mi", "m", "km", "spec"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dnd5e_damage_types() {
        let vocab = DnD5eVocabulary;
        assert!(vocab.damage_types().contains(&"fire"));
        assert!(vocab.damage_types().contains(&"cold"));
        assert!(!vocab.damage_types().contains(&"electricity")); // PF2e term
    }

    #[test]
    fn test_dnd5e_normalize_ability() {
        let vocab = DnD5eVocabulary;
        assert_eq!(vocab.normalize_ability("str"), Some("strength"));
        assert_eq!(vocab.normalize_ability("STR"), Some("strength"));
        assert_eq!(vocab.normalize_ability("strength"), Some("strength"));
        assert_eq!(vocab.normalize_ability("invalid"), None);
    }

    #[test]
    fn test_normalize_school_accepts_abbreviation() {
        let vocab = DnD5eVocabulary;
        assert_eq!(vocab.normalize_school("evo"), Some("evocation"));
        assert_eq!(vocab.normalize_school("Evocation"), Some("evocation"));
        assert_eq!(vocab.normalize_school("TRS"), Some("transmutation"));
        assert_eq!(vocab.normalize_school("pyromancy"), None);
    }

    #[test]
    fn test_normalize_activation() {
        let vocab = DnD5eVocabulary;
        assert_eq!(vocab.normalize_activation("Minute"), Some("minute"));
        assert_eq!(vocab.normalize_activation("turn"), None);
    }

    #[test]
    fn test_normalize_range_unit() {
        let vocab = DnD5eVocabulary;
        assert_eq!(vocab.normalize_range_unit(" FT "), Some("ft"));
        assert_eq!(vocab.normalize_range_unit("km"), Some("km"));
        assert_eq!(vocab.normalize_range_unit("planes"), None);
    }
}
