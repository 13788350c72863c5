//! Accuracy, critical hits and the damage formula.
//!
//! # Formula
//!
//! ```text
//! ratio    = attack / max(defense, 1)
//! damage   = floor(base × ratio × type × crit × factor)
//! if defender is shielded: damage = floor(damage / 2)
//! damage   = max(damage, 1)
//! ```
//!
//! `crit` is 1.5 on a critical hit, `factor` is drawn from `[0.85, 1.00]`.

use spellbound_core::rng::DeterministicRng;

use super::combatant::Combatant;
use super::definitions::SpellDefinition;
use super::discipline::{EffectivenessTier, type_multiplier};
use super::status::{StatusKind, has_status};

const MIN_HIT_CHANCE: i64 = 10;
const MAX_HIT_CHANCE: i64 = 100;
const NEUTRAL_ACCURACY: i64 = 90;
const BLESSED_BONUS: i64 = 20;
const INVISIBLE_PENALTY: i64 = 30;

const CRITICAL_MULTIPLIER: f64 = 1.5;
const MIN_RANDOM_FACTOR: f64 = 0.85;
const MEAN_RANDOM_FACTOR: f64 = 0.925;

/// Outcome of a damage roll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRoll {
    /// Damage to subtract from the defender.
    pub damage: u32,
    /// Whether the hit was critical.
    pub is_critical: bool,
    /// Effectiveness bucket of the matchup.
    pub effectiveness: EffectivenessTier,
}

impl DamageRoll {
    fn none() -> Self {
        Self {
            damage: 0,
            is_critical: false,
            effectiveness: EffectivenessTier::Normal,
        }
    }
}

/// Effective hit chance in percent, clamped to `[10, 100]`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn hit_chance(spell: &SpellDefinition, attacker: &Combatant, defender: &Combatant) -> u32 {
    let mut chance = i64::from(spell.accuracy())
        + (i64::from(attacker.stats.accuracy) - NEUTRAL_ACCURACY)
        - i64::from(defender.stats.evasion);
    if has_status(attacker, StatusKind::Blessed) {
        chance += BLESSED_BONUS;
    }
    if has_status(defender, StatusKind::Invisible) {
        chance -= INVISIBLE_PENALTY;
    }
    // Clamped into 10..=100, so the narrowing cast is lossless.
    chance.clamp(MIN_HIT_CHANCE, MAX_HIT_CHANCE) as u32
}

/// Rolls whether `spell` connects.
pub fn check_accuracy(
    spell: &SpellDefinition,
    attacker: &Combatant,
    defender: &Combatant,
    rng: &mut dyn DeterministicRng,
) -> bool {
    rng.roll_percent() < f64::from(hit_chance(spell, attacker, defender))
}

/// Applies the damage formula with every random input already decided.
#[must_use]
pub fn damage_formula(
    base: u32,
    attacker: &Combatant,
    defender: &Combatant,
    multiplier: f64,
    is_critical: bool,
    random_factor: f64,
) -> u32 {
    let ratio = f64::from(attacker.stats.attack) / f64::from(defender.stats.defense.max(1));
    let crit = if is_critical { CRITICAL_MULTIPLIER } else { 1.0 };
    let raw = (f64::from(base) * ratio * multiplier * crit * random_factor).floor();

    // Non-negative and floored; saturates on absurd stat inputs.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut damage = raw.min(f64::from(u32::MAX)) as u32;
    if has_status(defender, StatusKind::Shielded) {
        damage /= 2;
    }
    damage.max(1)
}

/// Rolls damage for `spell` from `attacker` against `defender`.
///
/// Draws the critical roll first and the random factor second. Spells
/// without base damage deal nothing and draw nothing.
pub fn calculate_damage(
    spell: &SpellDefinition,
    attacker: &Combatant,
    defender: &Combatant,
    rng: &mut dyn DeterministicRng,
) -> DamageRoll {
    let base = spell.damage();
    if base == 0 {
        return DamageRoll::none();
    }

    let multiplier = type_multiplier(spell.discipline, defender.discipline);
    let crit_chance = attacker.stats.crit_chance.saturating_add(spell.crit_bonus);
    let is_critical = rng.roll_percent() < f64::from(crit_chance);
    // Upper end inclusive: a draw of 0.0 yields exactly 1.0.
    let random_factor = 1.0 - rng.next_f64() * (1.0 - MIN_RANDOM_FACTOR);

    DamageRoll {
        damage: damage_formula(base, attacker, defender, multiplier, is_critical, random_factor),
        is_critical,
        effectiveness: EffectivenessTier::from_multiplier(multiplier),
    }
}

/// Deterministic damage forecast: no critical, mean random factor.
#[must_use]
pub fn estimate_damage(spell: &SpellDefinition, attacker: &Combatant, defender: &Combatant) -> u32 {
    let base = spell.damage();
    if base == 0 {
        return 0;
    }
    let multiplier = type_multiplier(spell.discipline, defender.discipline);
    damage_formula(base, attacker, defender, multiplier, false, MEAN_RANDOM_FACTOR)
}
