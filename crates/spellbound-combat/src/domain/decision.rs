//! Opponent decision heuristic.
//!
//! Every usable spell is scored and the best one is cast. Scores are
//! additive:
//!
//! | condition                                   | score |
//! |---------------------------------------------|-------|
//! | cannot afford the spell                     | -100, nothing else applies |
//! | forecast damage is lethal                   | +50   |
//! | super effective / weak                      | +30 / -20 |
//! | inflicts a status, opponent above half HP   | +15   |
//! | inflicts a status the opponent already has  | -20   |
//! | heals, own HP below 30% / 50% / otherwise   | +40 / +20 / -10 |
//! | declared priority                           | +priority |
//! | jitter                                      | [-5, +5] |

use spellbound_core::rng::DeterministicRng;

use super::combatant::Combatant;
use super::damage::estimate_damage;
use super::definitions::SpellDefinition;
use super::discipline::{Discipline, type_multiplier};
use super::resources::has_sufficient_resource;
use super::status::{StatusKind, has_status};

/// Score reported for spells the caster cannot afford. Exclusion is
/// decided by affordability, never by comparing against this value.
pub const EXCLUDED_SCORE: f64 = -100.0;

const LETHAL_BONUS: f64 = 50.0;
const SUPER_EFFECTIVE_BONUS: f64 = 30.0;
const WEAK_PENALTY: f64 = -20.0;
const STATUS_BONUS: f64 = 15.0;
const REDUNDANT_STATUS_PENALTY: f64 = -20.0;
const CRITICAL_HEAL_BONUS: f64 = 40.0;
const LOW_HEAL_BONUS: f64 = 20.0;
const WASTED_HEAL_PENALTY: f64 = -10.0;
const JITTER_SPAN: f64 = 10.0;

/// A scored candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSpell {
    /// The spell.
    pub spell: SpellDefinition,
    /// Whether the caster can pay for it; unaffordable spells are never cast.
    pub affordable: bool,
    /// Its score, [`EXCLUDED_SCORE`] when unaffordable.
    pub score: f64,
}

/// Deterministic part of a spell's score (everything but jitter), or
/// `None` when `actor` cannot afford it.
#[must_use]
pub fn base_score(
    spell: &SpellDefinition,
    actor: &Combatant,
    opponent: &Combatant,
) -> Option<f64> {
    if !has_sufficient_resource(actor, &spell.id, spell) {
        return None;
    }

    let mut score = 0.0;

    if spell.damage() > 0 && estimate_damage(spell, actor, opponent) >= opponent.current_health {
        score += LETHAL_BONUS;
    }

    let opponent_discipline = opponent.discipline.or(Some(Discipline::Charms));
    let multiplier = type_multiplier(spell.discipline, opponent_discipline);
    if multiplier >= 2.0 {
        score += SUPER_EFFECTIVE_BONUS;
    } else if multiplier <= 0.5 {
        score += WEAK_PENALTY;
    }

    if let Some(kind) = spell.status_effect.filter(|_| spell.inflicts_status()) {
        if opponent.health_fraction() > 0.5 {
            score += STATUS_BONUS;
        }
        if has_status(opponent, kind) {
            score += REDUNDANT_STATUS_PENALTY;
        }
    }

    if spell.heals() {
        let own = actor.health_fraction();
        score += if own < 0.3 {
            CRITICAL_HEAL_BONUS
        } else if own < 0.5 {
            LOW_HEAL_BONUS
        } else {
            WASTED_HEAL_PENALTY
        };
    }

    Some(score + f64::from(spell.priority))
}

/// Scores every candidate, drawing one jitter value per affordable spell.
pub fn score_spells(
    spells: &[SpellDefinition],
    actor: &Combatant,
    opponent: &Combatant,
    rng: &mut dyn DeterministicRng,
) -> Vec<ScoredSpell> {
    spells
        .iter()
        .map(|spell| match base_score(spell, actor, opponent) {
            Some(base) => ScoredSpell {
                spell: spell.clone(),
                affordable: true,
                score: base + rng.next_f64() * JITTER_SPAN - JITTER_SPAN / 2.0,
            },
            None => ScoredSpell {
                spell: spell.clone(),
                affordable: false,
                score: EXCLUDED_SCORE,
            },
        })
        .collect()
}

/// Picks the spell `actor` should cast at `opponent`.
///
/// Falls back to struggle when nothing is usable: no spells, none
/// affordable, or the actor is silenced. Ties go to the first candidate.
pub fn choose_spell(
    spells: &[SpellDefinition],
    actor: &Combatant,
    opponent: &Combatant,
    rng: &mut dyn DeterministicRng,
) -> SpellDefinition {
    if spells.is_empty() || has_status(actor, StatusKind::Silenced) {
        return SpellDefinition::struggle();
    }

    let mut best: Option<ScoredSpell> = None;
    for candidate in score_spells(spells, actor, opponent, rng) {
        if !candidate.affordable {
            continue;
        }
        if best.as_ref().is_none_or(|b| candidate.score > b.score) {
            best = Some(candidate);
        }
    }

    best.map_or_else(SpellDefinition::struggle, |b| b.spell)
}
