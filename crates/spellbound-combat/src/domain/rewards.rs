//! Victory rewards and the level-up loop.

use serde::{Deserialize, Serialize};
use spellbound_core::rng::DeterministicRng;

use super::definitions::{CreatureDefinition, Profile};

const EXPERIENCE_PER_LEVEL: u32 = 15;
const CURRENCY_PER_LEVEL: u32 = 3;

const HEALTH_PER_LEVEL: u32 = 10;
const ATTACK_PER_LEVEL: u32 = 2;
const DEFENSE_PER_LEVEL: u32 = 2;
const SPEED_PER_LEVEL: u32 = 1;

/// An item dropped by a defeated creature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDrop {
    /// Item identifier.
    pub item_id: String,
    /// Quantity.
    pub quantity: u32,
}

/// Everything granted for a victory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardBundle {
    /// Experience gained.
    pub experience: u32,
    /// Currency gained.
    pub currency: u32,
    /// Items dropped.
    pub items: Vec<ItemDrop>,
    /// Whether at least one level was gained.
    pub leveled_up: bool,
    /// The level after applying experience, when it changed.
    pub new_level: Option<u32>,
}

/// Rolls rewards for defeating `creature` at `level`.
///
/// Yields fall back to `level × 15` experience and `level × 3` currency
/// when the creature is unknown or declares none. Each drop is rolled
/// independently, one draw per table row.
pub fn roll_rewards(
    creature: Option<&CreatureDefinition>,
    level: u32,
    rng: &mut dyn DeterministicRng,
) -> RewardBundle {
    let experience = creature
        .and_then(|c| c.experience_yield)
        .unwrap_or_else(|| level.saturating_mul(EXPERIENCE_PER_LEVEL));
    let currency = creature
        .and_then(|c| c.currency_yield)
        .unwrap_or_else(|| level.saturating_mul(CURRENCY_PER_LEVEL));

    let items = creature
        .map(|c| c.drop_table.as_slice())
        .unwrap_or_default()
        .iter()
        .filter(|drop| rng.roll_percent() < f64::from(drop.chance))
        .map(|drop| ItemDrop {
            item_id: drop.item_id.clone(),
            quantity: drop.quantity,
        })
        .collect();

    RewardBundle {
        experience,
        currency,
        items,
        leveled_up: false,
        new_level: None,
    }
}

/// Adds `amount` experience and runs the level-up loop.
///
/// While experience meets the threshold, the threshold is subtracted and
/// then grown by 1.2× (floored, never below 1). Floored growth leaves
/// thresholds of 1 to 4 unchanged, so those profiles gain one level per
/// threshold's worth of experience. Each level adds health, attack,
/// defense and speed, saturating at `u32::MAX`. Returns the number of
/// levels gained; on return `experience < experience_to_next` holds.
pub fn gain_experience(profile: &mut Profile, amount: u64) -> u32 {
    profile.experience = profile.experience.saturating_add(amount);
    profile.experience_to_next = profile.experience_to_next.max(1);

    let mut levels: u32 = 0;
    while profile.experience >= profile.experience_to_next {
        let threshold = profile.experience_to_next;
        profile.experience -= threshold;
        profile.experience_to_next = threshold.saturating_add(threshold / 5);
        profile.level = profile.level.saturating_add(1);
        profile.max_health = profile.max_health.saturating_add(HEALTH_PER_LEVEL);
        profile.stats.attack = profile.stats.attack.saturating_add(ATTACK_PER_LEVEL);
        profile.stats.defense = profile.stats.defense.saturating_add(DEFENSE_PER_LEVEL);
        profile.stats.speed = profile.stats.speed.saturating_add(SPEED_PER_LEVEL);
        levels = levels.saturating_add(1);
    }
    levels
}

/// Credits `bundle` to `profile`, filling in its level-up fields.
pub fn apply_rewards(profile: &mut Profile, bundle: &mut RewardBundle) {
    let levels = gain_experience(profile, u64::from(bundle.experience));
    profile.currency = profile.currency.saturating_add(u64::from(bundle.currency));
    for drop in &bundle.items {
        profile.add_item(&drop.item_id, drop.quantity);
    }

    bundle.leveled_up = levels > 0;
    bundle.new_level = bundle.leveled_up.then_some(profile.level);
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::domain::combatant::BaseStats;
    use crate::domain::definitions::DropEntry;
    use spellbound_test_support::SequenceRng;
    use uuid::Uuid;

    fn profile(experience: u64, experience_to_next: u64) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            name: "Mira".to_owned(),
            level: 1,
            experience,
            experience_to_next,
            max_health: 100,
            stats: BaseStats {
                attack: 10,
                defense: 10,
                speed: 10,
                accuracy: 90,
                evasion: 0,
                crit_chance: 5,
            },
            discipline: None,
            spells: Vec::new(),
            inventory: BTreeMap::new(),
            currency: 0,
            companions: Vec::new(),
        }
    }

    fn creature(drops: Vec<DropEntry>) -> CreatureDefinition {
        CreatureDefinition {
            id: "wolf".to_owned(),
            name: "Wolf".to_owned(),
            discipline: None,
            max_health: 50,
            stats: BaseStats {
                attack: 10,
                defense: 10,
                speed: 10,
                accuracy: 90,
                evasion: 0,
                crit_chance: 0,
            },
            spells: Vec::new(),
            experience_yield: Some(40),
            currency_yield: Some(9),
            drop_table: drops,
            is_boss: false,
        }
    }

    #[test]
    fn test_declared_yields_are_used() {
        let mut rng = SequenceRng::new(vec![]);
        let bundle = roll_rewards(Some(&creature(Vec::new())), 4, &mut rng);
        assert_eq!(bundle.experience, 40);
        assert_eq!(bundle.currency, 9);
        assert!(bundle.items.is_empty());
    }

    #[test]
    fn test_missing_yields_fall_back_to_level() {
        let mut rng = SequenceRng::new(vec![]);
        let bundle = roll_rewards(None, 4, &mut rng);
        assert_eq!(bundle.experience, 60);
        assert_eq!(bundle.currency, 12);
    }

    #[test]
    fn test_each_drop_rolls_independently() {
        let drops = vec![
            DropEntry {
                item_id: "pelt".to_owned(),
                chance: 50,
                quantity: 2,
            },
            DropEntry {
                item_id: "fang".to_owned(),
                chance: 10,
                quantity: 1,
            },
            DropEntry {
                item_id: "gem".to_owned(),
                chance: 30,
                quantity: 1,
            },
        ];
        // pelt 40 < 50 yes, fang 20 < 10 no, gem 29 < 30 yes
        let mut rng = SequenceRng::new(vec![0.40, 0.20, 0.29]);

        let bundle = roll_rewards(Some(&creature(drops)), 1, &mut rng);

        assert_eq!(
            bundle.items,
            vec![
                ItemDrop {
                    item_id: "pelt".to_owned(),
                    quantity: 2
                },
                ItemDrop {
                    item_id: "gem".to_owned(),
                    quantity: 1
                },
            ]
        );
    }

    #[test]
    fn test_no_level_up_below_threshold() {
        let mut p = profile(10, 100);
        assert_eq!(gain_experience(&mut p, 50), 0);
        assert_eq!(p.level, 1);
        assert_eq!(p.experience, 60);
    }

    #[test]
    fn test_single_level_up_carries_remainder_and_grows_threshold() {
        let mut p = profile(90, 100);

        assert_eq!(gain_experience(&mut p, 25), 1);

        assert_eq!(p.level, 2);
        assert_eq!(p.experience, 15);
        assert_eq!(p.experience_to_next, 120);
        assert_eq!(p.max_health, 110);
        assert_eq!(p.stats.attack, 12);
        assert_eq!(p.stats.defense, 12);
        assert_eq!(p.stats.speed, 11);
    }

    #[test]
    fn test_multiple_level_ups_in_one_grant() {
        let mut p = profile(0, 100);

        // 100 → 120 → 144: 100 + 120 = 220 consumed, 30 left
        assert_eq!(gain_experience(&mut p, 250), 2);

        assert_eq!(p.level, 3);
        assert_eq!(p.experience, 30);
        assert_eq!(p.experience_to_next, 144);
        assert_eq!(p.max_health, 120);
        assert_eq!(p.stats.attack, 14);
    }

    #[test]
    fn test_loop_terminates_below_threshold_for_tiny_and_zero_thresholds() {
        for threshold in [0, 1, 2, 4] {
            let mut p = profile(0, threshold);
            gain_experience(&mut p, 10_000);
            assert!(p.experience < p.experience_to_next);
        }
    }

    #[test]
    fn test_small_thresholds_do_not_grow() {
        let mut p = profile(0, 3);

        assert_eq!(gain_experience(&mut p, 9), 3);

        assert_eq!(p.experience_to_next, 3);
        assert_eq!(p.experience, 0);
        assert_eq!(p.level, 4);
    }

    #[test]
    fn test_level_and_stats_saturate_instead_of_overflowing() {
        let mut p = profile(0, 1);
        p.level = u32::MAX - 1;
        p.max_health = u32::MAX - 5;
        p.stats.attack = u32::MAX;
        p.stats.defense = u32::MAX - 1;
        p.stats.speed = u32::MAX;

        assert_eq!(gain_experience(&mut p, 3), 3);

        assert_eq!(p.level, u32::MAX);
        assert_eq!(p.max_health, u32::MAX);
        assert_eq!(p.stats.attack, u32::MAX);
        assert_eq!(p.stats.defense, u32::MAX);
        assert_eq!(p.stats.speed, u32::MAX);
        assert!(p.experience < p.experience_to_next);
    }

    #[test]
    fn test_apply_rewards_credits_profile() {
        let mut p = profile(0, 100);
        let mut bundle = RewardBundle {
            experience: 120,
            currency: 7,
            items: vec![ItemDrop {
                item_id: "pelt".to_owned(),
                quantity: 2,
            }],
            leveled_up: false,
            new_level: None,
        };

        apply_rewards(&mut p, &mut bundle);

        assert!(bundle.leveled_up);
        assert_eq!(bundle.new_level, Some(2));
        assert_eq!(p.currency, 7);
        assert_eq!(p.item_count("pelt"), 2);
    }
}
