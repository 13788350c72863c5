//! Cast-resource ("PP") ledger.

use super::combatant::Combatant;
use super::definitions::SpellDefinition;

/// Remaining resource for `spell_id`; a spell never cast is at its cap.
#[must_use]
pub fn remaining_resource(combatant: &Combatant, spell_id: &str, spell: &SpellDefinition) -> u32 {
    combatant
        .resources
        .get(spell_id)
        .copied()
        .unwrap_or_else(|| spell.max_resource())
}

/// Whether `combatant` can afford one cast of `spell`.
#[must_use]
pub fn has_sufficient_resource(
    combatant: &Combatant,
    spell_id: &str,
    spell: &SpellDefinition,
) -> bool {
    remaining_resource(combatant, spell_id, spell) >= spell.cost()
}

/// Spends one cast of `spell`, flooring the pool at zero.
#[must_use]
pub fn consume_resource(
    mut combatant: Combatant,
    spell_id: &str,
    spell: &SpellDefinition,
) -> Combatant {
    let remaining = remaining_resource(&combatant, spell_id, spell).saturating_sub(spell.cost());
    combatant.resources.insert(spell_id.to_owned(), remaining);
    combatant
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::combatant::fixtures::combatant;

    fn spell(cost: Option<u32>, cap: Option<u32>) -> SpellDefinition {
        SpellDefinition {
            id: "spark".to_owned(),
            name: "Spark".to_owned(),
            cost,
            max_resource: cap,
            ..SpellDefinition::struggle()
        }
    }

    #[test]
    fn test_unset_resource_defaults_to_cap() {
        let c = combatant("Mira");
        assert_eq!(remaining_resource(&c, "spark", &spell(None, Some(12))), 12);
        assert_eq!(remaining_resource(&c, "spark", &spell(None, None)), 20);
    }

    #[test]
    fn test_three_left_is_insufficient_for_cost_five() {
        let mut c = combatant("Mira");
        c.resources.insert("spark".to_owned(), 3);
        assert!(!has_sufficient_resource(&c, "spark", &spell(None, None)));
    }

    #[test]
    fn test_exact_amount_is_sufficient() {
        let mut c = combatant("Mira");
        c.resources.insert("spark".to_owned(), 5);
        assert!(has_sufficient_resource(&c, "spark", &spell(None, None)));
    }

    #[test]
    fn test_consume_subtracts_cost_from_cap() {
        let c = consume_resource(combatant("Mira"), "spark", &spell(Some(4), Some(10)));
        assert_eq!(c.resources.get("spark"), Some(&6));
    }

    #[test]
    fn test_consume_never_goes_below_zero() {
        let mut c = combatant("Mira");
        c.resources.insert("spark".to_owned(), 2);
        let c = consume_resource(c, "spark", &spell(Some(5), None));
        assert_eq!(c.resources.get("spark"), Some(&0));
    }
}
