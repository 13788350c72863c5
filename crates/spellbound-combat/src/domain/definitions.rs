//! Read-only reference data (spells, items, creatures, encounters) and the
//! persisted player profile.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::combatant::BaseStats;
use super::discipline::Discipline;
use super::status::{DEFAULT_STATUS_DURATION, StatusKind};

/// Identifier of the built-in fallback attack.
pub const STRUGGLE_ID: &str = "struggle";

const DEFAULT_ACCURACY: u32 = 95;
const DEFAULT_COST: u32 = 5;
const DEFAULT_CAP: u32 = 20;

/// Who a spell is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellTarget {
    /// The caster.
    #[serde(rename = "self")]
    Caster,
    /// The opposing combatant.
    #[default]
    Other,
}

/// A castable spell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellDefinition {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Discipline, if any.
    #[serde(default)]
    pub discipline: Option<Discipline>,
    /// Base damage; absent or zero for non-damaging spells.
    #[serde(default)]
    pub base_damage: Option<u32>,
    /// Hit chance in percent before modifiers.
    #[serde(default)]
    pub accuracy: Option<u32>,
    /// Resource spent per cast.
    #[serde(default)]
    pub cost: Option<u32>,
    /// Resource pool size.
    #[serde(default)]
    pub max_resource: Option<u32>,
    /// Condition this spell may inflict.
    #[serde(default)]
    pub status_effect: Option<StatusKind>,
    /// Percent chance to inflict `status_effect`.
    #[serde(default)]
    pub status_chance: u32,
    /// How long an inflicted condition lasts.
    #[serde(default)]
    pub status_duration: Option<u32>,
    /// Health restored to the caster by self-targeted spells.
    #[serde(default)]
    pub heal_amount: u32,
    /// Who the spell is aimed at.
    #[serde(default)]
    pub target: SpellTarget,
    /// Added to the caster's critical chance.
    #[serde(default)]
    pub crit_bonus: u32,
    /// Preference weight for the opponent heuristic.
    #[serde(default)]
    pub priority: i32,
}

impl SpellDefinition {
    /// The cost-free physical attack used when nothing else is available.
    #[must_use]
    pub fn struggle() -> Self {
        Self {
            id: STRUGGLE_ID.to_owned(),
            name: "Struggle".to_owned(),
            discipline: None,
            base_damage: Some(10),
            accuracy: Some(100),
            cost: Some(0),
            max_resource: None,
            status_effect: None,
            status_chance: 0,
            status_duration: None,
            heal_amount: 0,
            target: SpellTarget::Other,
            crit_bonus: 0,
            priority: i32::MIN / 2,
        }
    }

    /// Whether this is the built-in fallback attack.
    #[must_use]
    pub fn is_struggle(&self) -> bool {
        self.id == STRUGGLE_ID
    }

    /// Base damage, zero for non-damaging spells.
    #[must_use]
    pub fn damage(&self) -> u32 {
        self.base_damage.unwrap_or(0)
    }

    /// Hit chance before modifiers.
    #[must_use]
    pub fn accuracy(&self) -> u32 {
        self.accuracy.unwrap_or(DEFAULT_ACCURACY)
    }

    /// Resource spent per cast.
    #[must_use]
    pub fn cost(&self) -> u32 {
        self.cost.unwrap_or(DEFAULT_COST)
    }

    /// Resource pool size.
    #[must_use]
    pub fn max_resource(&self) -> u32 {
        self.max_resource.unwrap_or(DEFAULT_CAP)
    }

    /// Lifetime of an inflicted condition.
    #[must_use]
    pub fn status_duration(&self) -> u32 {
        self.status_duration.unwrap_or(DEFAULT_STATUS_DURATION)
    }

    /// Whether the spell can inflict a condition.
    #[must_use]
    pub fn inflicts_status(&self) -> bool {
        self.status_effect.is_some() && self.status_chance > 0
    }

    /// Whether the spell heals its caster.
    #[must_use]
    pub fn heals(&self) -> bool {
        self.heal_amount > 0
    }
}

/// A consumable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Health restored to the player.
    #[serde(default)]
    pub heal_amount: u32,
    /// Conditions removed from the player.
    #[serde(default)]
    pub cures: Vec<StatusKind>,
    /// Whether it may be used mid-battle.
    #[serde(default)]
    pub usable_in_battle: bool,
}

/// One possible drop from a defeated creature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropEntry {
    /// Item dropped.
    pub item_id: String,
    /// Percent chance.
    pub chance: u32,
    /// Quantity dropped.
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

/// An opponent template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureDefinition {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Discipline.
    #[serde(default)]
    pub discipline: Option<Discipline>,
    /// Health at level 1.
    pub max_health: u32,
    /// Stats at level 1.
    pub stats: BaseStats,
    /// Spells it can cast.
    #[serde(default)]
    pub spells: Vec<String>,
    /// Experience granted on defeat; `level × 15` when absent.
    #[serde(default)]
    pub experience_yield: Option<u32>,
    /// Currency granted on defeat; `level × 3` when absent.
    #[serde(default)]
    pub currency_yield: Option<u32>,
    /// Independent drop rolls.
    #[serde(default)]
    pub drop_table: Vec<DropEntry>,
    /// Bosses cannot be fled from.
    #[serde(default)]
    pub is_boss: bool,
}

/// Weighted random-encounter row for a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterEntry {
    /// Location label.
    pub location: String,
    /// Creature that may appear.
    pub creature_id: String,
    /// Relative weight.
    pub weight: u32,
    /// Lowest level it appears at.
    pub min_level: u32,
    /// Highest level it appears at.
    pub max_level: u32,
}

/// Persisted player progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Identifier.
    pub id: Uuid,
    /// Player character name.
    pub name: String,
    /// Level.
    pub level: u32,
    /// Experience towards the next level.
    pub experience: u64,
    /// Experience needed for the next level.
    pub experience_to_next: u64,
    /// Maximum health.
    pub max_health: u32,
    /// Base stats.
    pub stats: BaseStats,
    /// Discipline.
    #[serde(default)]
    pub discipline: Option<Discipline>,
    /// Known spells.
    #[serde(default)]
    pub spells: Vec<String>,
    /// Item → quantity owned.
    #[serde(default)]
    pub inventory: BTreeMap<String, u32>,
    /// Currency.
    #[serde(default)]
    pub currency: u64,
    /// Creatures fighting alongside the player.
    #[serde(default)]
    pub companions: Vec<String>,
}

impl Profile {
    /// How many of `item_id` the player owns.
    #[must_use]
    pub fn item_count(&self, item_id: &str) -> u32 {
        self.inventory.get(item_id).copied().unwrap_or(0)
    }

    /// Removes one `item_id`, dropping the entry when none remain.
    pub fn consume_item(&mut self, item_id: &str) {
        if let Some(count) = self.inventory.get_mut(item_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.inventory.remove(item_id);
            }
        }
    }

    /// Adds `quantity` of `item_id`.
    pub fn add_item(&mut self, item_id: &str, quantity: u32) {
        *self.inventory.entry(item_id.to_owned()).or_insert(0) += quantity;
    }
}
