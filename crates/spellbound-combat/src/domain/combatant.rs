//! Combatant snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::discipline::Discipline;
use super::status::{StatusEntry, StatusKind};

/// Base stat bundle shared by players, companions and creatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    /// Offensive power.
    pub attack: u32,
    /// Damage mitigation.
    pub defense: u32,
    /// Turn-order rank.
    pub speed: u32,
    /// Hit bonus; 90 is neutral.
    pub accuracy: u32,
    /// Subtracted from attackers' hit chance.
    pub evasion: u32,
    /// Critical-hit chance, in percent.
    pub crit_chance: u32,
}

/// One participant's live battle snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    /// Display name; unique within a battle.
    pub name: String,
    /// Whether this combatant is controlled by the player.
    pub is_player: bool,
    /// Creature definition this combatant was built from, if any.
    #[serde(default)]
    pub creature_id: Option<String>,
    /// Current health, `0..=max_health`.
    pub current_health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Remaining cast resource ("PP") per spell. Unset means full.
    #[serde(default)]
    pub resources: BTreeMap<String, u32>,
    /// Base stats.
    pub stats: BaseStats,
    /// Usable spell identifiers.
    #[serde(default)]
    pub spells: Vec<String>,
    /// Active status entries, at most one per kind.
    #[serde(default)]
    pub statuses: Vec<StatusEntry>,
    /// Level.
    pub level: u32,
    /// Magical discipline.
    #[serde(default)]
    pub discipline: Option<Discipline>,
}

impl Combatant {
    /// Whether the combatant has no health left.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.current_health == 0
    }

    /// Current health as a fraction of maximum.
    #[must_use]
    pub fn health_fraction(&self) -> f64 {
        if self.max_health == 0 {
            return 0.0;
        }
        f64::from(self.current_health) / f64::from(self.max_health)
    }

    /// Returns the combatant after losing `amount` health, floored at zero.
    #[must_use]
    pub fn take_damage(mut self, amount: u32) -> Self {
        self.current_health = self.current_health.saturating_sub(amount);
        self
    }

    /// Returns the combatant after regaining up to `amount` health, capped at
    /// maximum, along with the health actually restored.
    #[must_use]
    pub fn heal(mut self, amount: u32) -> (Self, u32) {
        let before = self.current_health;
        self.current_health = before.saturating_add(amount).min(self.max_health);
        let restored = self.current_health - before;
        (self, restored)
    }

    /// Checks the snapshot invariants, returning a description of the first
    /// violation.
    ///
    /// # Errors
    ///
    /// Returns the violation message when health exceeds maximum or two
    /// status entries share a kind.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.current_health > self.max_health {
            return Err(format!(
                "{} has {} health but a maximum of {}",
                self.name, self.current_health, self.max_health
            ));
        }
        let mut seen: Vec<StatusKind> = Vec::with_capacity(self.statuses.len());
        for entry in &self.statuses {
            if seen.contains(&entry.kind) {
                return Err(format!("{} carries {:?} twice", self.name, entry.kind));
            }
            seen.push(entry.kind);
        }
        Ok(())
    }
}
