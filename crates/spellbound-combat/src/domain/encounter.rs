//! Building combatants from profiles and creatures, and rolling random
//! encounters.

use std::collections::BTreeMap;

use spellbound_core::rng::DeterministicRng;

use super::combatant::{BaseStats, Combatant};
use super::definitions::{CreatureDefinition, EncounterEntry, Profile};

/// An encounter roll: which creature appears and at what level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterRoll {
    /// Creature that appears.
    pub creature_id: String,
    /// Its level.
    pub level: u32,
}

/// Picks a creature from `table` by weight, then a level in its range.
///
/// Returns `None` when the table is empty or every weight is zero.
pub fn pick_encounter(
    table: &[EncounterEntry],
    rng: &mut dyn DeterministicRng,
) -> Option<EncounterRoll> {
    let total: u64 = table.iter().map(|e| u64::from(e.weight)).sum();
    if total == 0 {
        return None;
    }

    let mut roll = roll_below(total, rng);
    let entry = table.iter().find(|e| {
        let weight = u64::from(e.weight);
        if roll < weight {
            true
        } else {
            roll -= weight;
            false
        }
    })?;

    let min_level = entry.min_level.max(1);
    let max_level = entry.max_level.max(min_level);
    Some(EncounterRoll {
        creature_id: entry.creature_id.clone(),
        level: rng.next_u32_range(min_level, max_level),
    })
}

/// A draw in `[0, total)`. Totals past `u32` range scale a unit draw.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn roll_below(total: u64, rng: &mut dyn DeterministicRng) -> u64 {
    match u32::try_from(total - 1) {
        Ok(max) => u64::from(rng.next_u32_range(0, max)),
        Err(_) => ((rng.next_f64() * total as f64) as u64).min(total - 1),
    }
}

/// Stat multiplier for a creature at `level`: `1 + (level - 1) × 0.1`.
#[must_use]
pub fn level_scale(level: u32) -> f64 {
    1.0 + f64::from(level.saturating_sub(1)) * 0.1
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled(value: u32, scale: f64) -> u32 {
    (f64::from(value) * scale).floor() as u32
}

/// Builds a non-player combatant from `creature` at `level`.
///
/// Health, attack, defense and speed scale with level; accuracy, evasion
/// and critical chance do not.
#[must_use]
pub fn creature_combatant(creature: &CreatureDefinition, level: u32) -> Combatant {
    let level = level.max(1);
    let scale = level_scale(level);
    let max_health = scaled(creature.max_health, scale).max(1);

    Combatant {
        name: creature.name.clone(),
        is_player: false,
        creature_id: Some(creature.id.clone()),
        current_health: max_health,
        max_health,
        resources: BTreeMap::new(),
        stats: BaseStats {
            attack: scaled(creature.stats.attack, scale),
            defense: scaled(creature.stats.defense, scale),
            speed: scaled(creature.stats.speed, scale),
            ..creature.stats
        },
        spells: creature.spells.clone(),
        statuses: Vec::new(),
        level,
        discipline: creature.discipline,
    }
}

/// Builds the player's combatant at full health from `profile`.
#[must_use]
pub fn player_combatant(profile: &Profile) -> Combatant {
    Combatant {
        name: profile.name.clone(),
        is_player: true,
        creature_id: None,
        current_health: profile.max_health,
        max_health: profile.max_health,
        resources: BTreeMap::new(),
        stats: profile.stats,
        spells: profile.spells.clone(),
        statuses: Vec::new(),
        level: profile.level,
        discipline: profile.discipline,
    }
}

/// Builds a companion fighting on the player's side.
#[must_use]
pub fn companion_combatant(creature: &CreatureDefinition, level: u32) -> Combatant {
    Combatant {
        is_player: true,
        ..creature_combatant(creature, level)
    }
}
