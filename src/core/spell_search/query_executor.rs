//! Query Executor
//!
//! Turns a parsed advanced query into either a filter-state patch or a
//! per-record predicate.

use super::fields::{FieldId, Value, MATERIAL_CONSUMED};
use super::filter_state::{FilterKey, FilterPatch, FilterValue};
use super::query_parser::{FieldExpr, QueryAst};
use super::record::SpellRecord;

/// Compute the filter-state patch an advanced query implies.
///
/// Dropdown booleans (`requiresSave`, `concentration`) are written as
/// `"true"`/`"false"`; checkbox booleans as plain flags. The free-text
/// name filter is never touched.
pub fn apply_to_state(ast: &QueryAst) -> FilterPatch {
    let mut patch = FilterPatch::new();
    for leaf in ast.leaves() {
        match (leaf.field, &leaf.value) {
            (FieldId::Range, Value::Range(bounds)) => {
                patch.push(FilterKey::MinRange, FilterValue::Bound(bounds.min));
                patch.push(FilterKey::MaxRange, FilterValue::Bound(bounds.max));
            }
            (field, Value::Bool(flag)) => {
                let key = state_key(field);
                let value = match key {
                    FilterKey::RequiresSave | FilterKey::Concentration => {
                        FilterValue::text(flag.to_string())
                    }
                    _ => FilterValue::Flag(*flag),
                };
                patch.push(key, value);
            }
            (field, Value::Number(n)) => patch.push(state_key(field), FilterValue::text(n.to_string())),
            (field, Value::Enum(id)) => patch.push(state_key(field), FilterValue::text(id.clone())),
            (_, Value::Range(_)) => {}
        }
    }
    patch
}

fn state_key(field: FieldId) -> FilterKey {
    match field {
        FieldId::Level => FilterKey::Level,
        FieldId::School => FilterKey::School,
        FieldId::CastingTime => FilterKey::CastingTime,
        FieldId::Range => FilterKey::MinRange,
        FieldId::DamageType => FilterKey::DamageType,
        FieldId::Condition => FilterKey::Condition,
        FieldId::RequiresSave => FilterKey::RequiresSave,
        FieldId::Concentration => FilterKey::Concentration,
        FieldId::MaterialComponents => FilterKey::MaterialComponents,
        FieldId::Prepared => FilterKey::Prepared,
        FieldId::Ritual => FilterKey::Ritual,
        FieldId::Favorited => FilterKey::Favorited,
    }
}

/// Evaluate an advanced query against one record.
pub fn evaluate(ast: &QueryAst, record: &SpellRecord) -> bool {
    ast.leaves().iter().all(|leaf| evaluate_leaf(leaf, record))
}

/// Evaluate a single leaf.
pub fn evaluate_leaf(leaf: &FieldExpr, record: &SpellRecord) -> bool {
    match (leaf.field, &leaf.value) {
        (FieldId::Level, Value::Number(level)) => record.level.map(u32::from) == Some(*level),
        (FieldId::School, Value::Enum(school)) => record
            .school
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(school)),
        (FieldId::CastingTime, Value::Enum(key)) => record
            .casting_time_key()
            .is_some_and(|k| k.eq_ignore_ascii_case(key)),
        (FieldId::DamageType, Value::Enum(damage)) => record.has_damage_type(damage),
        (FieldId::Condition, Value::Enum(condition)) => record.has_condition(condition),
        (FieldId::MaterialComponents, Value::Enum(choice)) => {
            record.has_consumed_materials() == (choice == MATERIAL_CONSUMED)
        }
        (FieldId::RequiresSave, Value::Bool(b)) => record.requires_save() == *b,
        (FieldId::Concentration, Value::Bool(b)) => record.requires_concentration() == *b,
        (FieldId::Prepared, Value::Bool(b)) => record.is_prepared == *b,
        (FieldId::Ritual, Value::Bool(b)) => record.is_ritual() == *b,
        (FieldId::Favorited, Value::Bool(b)) => record.is_favorited == *b,
        // No usable range data is neutral.
        (FieldId::Range, Value::Range(bounds)) => record
            .canonical_range()
            .map_or(true, |feet| bounds.contains(feet)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spell_search::query_parser::QueryParser;

    fn fireball() -> SpellRecord {
        SpellRecord::new("fireball", "Fireball")
            .with_level(3)
            .with_school("evocation")
            .with_activation("action", 1)
            .with_range(150, "ft")
            .with_save("dexterity")
            .with_damage_type("fire")
    }

    fn parse(query: &str) -> QueryAst {
        QueryParser::default().parse(query).unwrap()
    }

    #[test]
    fn test_apply_to_state_patch() {
        let patch = apply_to_state(&parse("^level:3 AND damage:fire AND range:30-* AND conc:no AND ritual:yes"));
        assert_eq!(patch.get(FilterKey::Level), Some(&FilterValue::text("3")));
        assert_eq!(patch.get(FilterKey::DamageType), Some(&FilterValue::text("fire")));
        assert_eq!(patch.get(FilterKey::MinRange), Some(&FilterValue::Bound(Some(30))));
        assert_eq!(patch.get(FilterKey::MaxRange), Some(&FilterValue::Bound(None)));
        assert_eq!(patch.get(FilterKey::Concentration), Some(&FilterValue::text("false")));
        assert_eq!(patch.get(FilterKey::Ritual), Some(&FilterValue::Flag(true)));
        assert_eq!(patch.get(FilterKey::Name), None);
    }

    #[test]
    fn test_evaluate_conjunction() {
        let record = fireball();
        assert!(evaluate(&parse("^level:3 AND damageType:fire"), &record));
        assert!(evaluate(&parse("^school:evo AND cast:action AND save:yes"), &record));
        assert!(!evaluate(&parse("^level:3 AND damage:cold"), &record));
        assert!(evaluate(&parse("^"), &record));
    }

    #[test]
    fn test_evaluate_range_rules() {
        let ast = parse("^range:30-60");
        assert!(!evaluate(&ast, &SpellRecord::new("a", "A").with_range(90, "ft")));
        assert!(!evaluate(&ast, &SpellRecord::new("b", "B").with_range(1, "mi")));
        assert!(evaluate(&ast, &SpellRecord::new("c", "C").with_range(45, "ft")));
        assert!(evaluate(&ast, &SpellRecord::new("d", "D")));
        assert!(evaluate(&ast, &SpellRecord::new("e", "E").with_range(10, "leagues")));
    }

    #[test]
    fn test_missing_data_never_matches_positive_filter() {
        let bare = SpellRecord::new("x", "Unknown");
        assert!(!evaluate(&parse("^level:0"), &bare));
        assert!(!evaluate(&parse("^school:evocation"), &bare));
        assert!(!evaluate(&parse("^cast:action"), &bare));
        assert!(evaluate(&parse("^save:no AND ritual:no"), &bare));
        assert!(evaluate(&parse("^materials:notConsumed"), &bare));
    }
}
