//! Timed status conditions: application, action gating, and end-of-turn
//! ticking.

use serde::{Deserialize, Serialize};
use spellbound_core::rng::DeterministicRng;

use super::combatant::Combatant;

/// Default lifetime of a freshly applied status, in turns.
pub const DEFAULT_STATUS_DURATION: u32 = 3;

/// Percent chance that a frozen combatant stays unable to act.
const FROZEN_HOLD_CHANCE: f64 = 25.0;

/// Percent chance that a confused combatant loses its turn.
const CONFUSED_SKIP_CHANCE: f64 = 33.0;

/// Kinds of timed condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Loses 1/16 of max health per tick.
    Burning,
    /// Loses 1/12 of max health per tick.
    Poisoned,
    /// Cannot act.
    Stunned,
    /// Usually cannot act.
    Frozen,
    /// Sometimes cannot act.
    Confused,
    /// Cannot cast spells.
    Silenced,
    /// +20 accuracy.
    Blessed,
    /// -30 accuracy for attackers.
    Invisible,
    /// Halves incoming damage.
    Shielded,
}

impl StatusKind {
    /// Lower-case label used in messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Burning => "burning",
            Self::Poisoned => "poisoned",
            Self::Stunned => "stunned",
            Self::Frozen => "frozen",
            Self::Confused => "confused",
            Self::Silenced => "silenced",
            Self::Blessed => "blessed",
            Self::Invisible => "invisible",
            Self::Shielded => "shielded",
        }
    }
}

/// An active condition and how long it has left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// The condition.
    pub kind: StatusKind,
    /// Ticks before it expires.
    pub turns_remaining: u32,
}

impl StatusEntry {
    /// Creates a status entry.
    #[must_use]
    pub fn new(kind: StatusKind, turns_remaining: u32) -> Self {
        Self {
            kind,
            turns_remaining,
        }
    }
}

/// Why a combatant cannot act this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// Health is zero.
    Fainted,
    /// Stunned.
    Stunned,
    /// Frozen and failed the thaw roll.
    Frozen,
    /// Confused and lost the turn.
    Confused,
}

/// Result of an action-eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// May take any action.
    Free,
    /// May act, but not cast spells.
    Silenced,
    /// Loses the turn.
    Blocked(BlockReason),
}

impl Eligibility {
    /// Whether the combatant may act at all.
    #[must_use]
    pub fn can_act(self) -> bool {
        !matches!(self, Self::Blocked(_))
    }

    /// Human-readable reason for a restriction, naming the combatant.
    #[must_use]
    pub fn reason(self, name: &str) -> Option<String> {
        match self {
            Self::Free => None,
            Self::Silenced => Some(format!("{name} is silenced and cannot cast spells!")),
            Self::Blocked(BlockReason::Fainted) => Some(format!("{name} has fainted!")),
            Self::Blocked(BlockReason::Stunned) => Some(format!("{name} is stunned and cannot move!")),
            Self::Blocked(BlockReason::Frozen) => Some(format!("{name} is frozen solid!")),
            Self::Blocked(BlockReason::Confused) => {
                Some(format!("{name} is confused and stumbles about!"))
            }
        }
    }
}

/// Result of one end-of-turn tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTick {
    /// Total damage taken from damage-over-time conditions.
    pub damage_dealt: u32,
    /// Conditions that ran out this tick.
    pub expired: Vec<StatusKind>,
    /// The combatant after the tick.
    pub updated: Combatant,
}

/// Whether `combatant` carries `kind`.
#[must_use]
pub fn has_status(combatant: &Combatant, kind: StatusKind) -> bool {
    combatant.statuses.iter().any(|s| s.kind == kind)
}

/// Adds `kind` for `duration` turns unless it is already present.
#[must_use]
pub fn apply_status(mut combatant: Combatant, kind: StatusKind, duration: u32) -> Combatant {
    if !has_status(&combatant, kind) {
        combatant.statuses.push(StatusEntry::new(kind, duration));
    }
    combatant
}

/// Removes `kind` if present.
#[must_use]
pub fn cure_status(mut combatant: Combatant, kind: StatusKind) -> Combatant {
    combatant.statuses.retain(|s| s.kind != kind);
    combatant
}

/// Decides whether `combatant` may act this turn.
///
/// Checked in order: fainted, stunned, frozen, confused, silenced. The first
/// disqualifying condition wins. Frozen is not cleared when the combatant
/// acts anyway. Draws from `rng` only for frozen and confused.
pub fn can_act(combatant: &Combatant, rng: &mut dyn DeterministicRng) -> Eligibility {
    if combatant.is_defeated() {
        return Eligibility::Blocked(BlockReason::Fainted);
    }
    if has_status(combatant, StatusKind::Stunned) {
        return Eligibility::Blocked(BlockReason::Stunned);
    }
    if has_status(combatant, StatusKind::Frozen) && rng.roll_percent() < FROZEN_HOLD_CHANCE {
        return Eligibility::Blocked(BlockReason::Frozen);
    }
    if has_status(combatant, StatusKind::Confused) && rng.roll_percent() < CONFUSED_SKIP_CHANCE {
        return Eligibility::Blocked(BlockReason::Confused);
    }
    if has_status(combatant, StatusKind::Silenced) {
        return Eligibility::Silenced;
    }
    Eligibility::Free
}

/// Applies damage-over-time and counts every condition down by one turn.
#[must_use]
pub fn tick_statuses(combatant: &Combatant) -> StatusTick {
    let mut updated = combatant.clone();
    let mut damage_dealt: u32 = 0;
    let mut expired = Vec::new();

    for entry in &combatant.statuses {
        damage_dealt += match entry.kind {
            StatusKind::Burning => combatant.max_health / 16,
            StatusKind::Poisoned => combatant.max_health / 12,
            _ => 0,
        };
    }

    updated.statuses = combatant
        .statuses
        .iter()
        .filter_map(|entry| {
            let turns_remaining = entry.turns_remaining.saturating_sub(1);
            if turns_remaining == 0 {
                expired.push(entry.kind);
                None
            } else {
                Some(StatusEntry::new(entry.kind, turns_remaining))
            }
        })
        .collect();

    updated = updated.take_damage(damage_dealt);

    StatusTick {
        damage_dealt,
        expired,
        updated,
    }
}
