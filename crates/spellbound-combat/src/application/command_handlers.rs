//! Command handlers for the combat engine.
//!
//! Each handler takes the battle's lock, loads the session snapshot, runs
//! the synchronous domain method, and commits the new snapshot, its log
//! entries and any profile change in one store call. Refused actions
//! persist nothing.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use spellbound_core::clock::Clock;
use spellbound_core::error::DomainError;
use spellbound_core::rng::DeterministicRng;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::locks::BattleLocks;
use crate::application::ports::{BattleStore, ContentCatalog};
use crate::domain::commands::{
    EndBattle, ExecuteAction, ExecuteAiTurn, InitializeBattle, ProcessTurnEnd,
};
use crate::domain::decision::choose_spell;
use crate::domain::definitions::{Profile, STRUGGLE_ID};
use crate::domain::encounter::{
    companion_combatant, creature_combatant, pick_encounter, player_combatant,
};
use crate::domain::rewards::{RewardBundle, apply_rewards, roll_rewards};
use crate::domain::session::{
    ActionResult, BattleAction, BattleOutcome, BattleSession, NewBattle, PreparedAction,
    TurnEndReport,
};

/// Result of the opponent's turn.
#[derive(Debug, Clone, Serialize)]
pub struct AiTurnReport {
    /// Spell the heuristic picked; `None` when the turn was skipped.
    pub chosen_spell: Option<String>,
    /// The resolved action.
    pub result: ActionResult,
}

/// Result of finalizing a battle.
#[derive(Debug, Clone, Serialize)]
pub struct BattleSettlement {
    /// The battle.
    pub battle_id: Uuid,
    /// How it ended.
    pub outcome: BattleOutcome,
    /// Rewards granted on victory.
    pub rewards: Option<RewardBundle>,
}

fn lock_rng(
    rng: &Mutex<dyn DeterministicRng + Send>,
) -> Result<MutexGuard<'_, dyn DeterministicRng + Send + 'static>, DomainError> {
    rng.lock()
        .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))
}

/// Loads a session and checks its invariants.
///
/// # Errors
///
/// Returns `DomainError::BattleNotFound` if no session exists, or
/// `DomainError::CorruptSession` if it breaks an invariant.
pub(crate) async fn load_session(
    store: &dyn BattleStore,
    battle_id: Uuid,
) -> Result<BattleSession, DomainError> {
    let session = store
        .get_session(battle_id)
        .await?
        .ok_or(DomainError::BattleNotFound(battle_id))?;
    session.check_invariants()?;
    Ok(session)
}

async fn load_profile(store: &dyn BattleStore, profile_id: Uuid) -> Result<Profile, DomainError> {
    store
        .get_profile(profile_id)
        .await?
        .ok_or(DomainError::ProfileNotFound(profile_id))
}

/// Commits the next version of `session`, its pending log and `profile`
/// together. On error nothing was stored and the caller drops `session`.
async fn persist(
    store: &dyn BattleStore,
    session: &mut BattleSession,
    profile: Option<&Profile>,
) -> Result<(), DomainError> {
    let entries = session.take_uncommitted_log();
    let expected_version = session.version;
    session.version += 1;
    store
        .commit(session, expected_version, &entries, profile)
        .await
}

/// Handles the `InitializeBattle` command: builds the combatants, computes
/// the initial turn order, and persists a new session in the `intro` phase.
///
/// An explicit creature fights at the profile's level. Otherwise a creature
/// is rolled from the location's encounter table with a level inside the
/// entry's range. Companions the catalog does not know are skipped.
///
/// # Errors
///
/// Returns `DomainError::ProfileNotFound` if the profile does not exist,
/// `DomainError::Validation` if the creature is unknown or the location has
/// no encounters, or any persistence error.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, profile_id = %command.profile_id))]
pub async fn handle_initialize_battle(
    command: &InitializeBattle,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    store: &dyn BattleStore,
    catalog: &dyn ContentCatalog,
) -> Result<BattleSession, DomainError> {
    let profile = load_profile(store, command.profile_id).await?;

    let (creature, level) = if let Some(creature_id) = &command.creature_id {
        let creature = catalog
            .get_creature(creature_id)
            .await?
            .ok_or_else(|| DomainError::Validation(format!("unknown creature: {creature_id}")))?;
        (creature, profile.level)
    } else {
        let table = catalog.encounter_table(&command.location).await?;
        let roll = {
            let mut rng_guard = lock_rng(rng)?;
            pick_encounter(&table, &mut *rng_guard)
        }
        .ok_or_else(|| {
            DomainError::Validation(format!("no encounters at location: {}", command.location))
        })?;
        let creature = catalog.get_creature(&roll.creature_id).await?.ok_or_else(|| {
            DomainError::Validation(format!(
                "encounter table for {} names unknown creature {}",
                command.location, roll.creature_id
            ))
        })?;
        (creature, roll.level)
    };

    let mut companions = Vec::with_capacity(profile.companions.len());
    for companion_id in &profile.companions {
        match catalog.get_creature(companion_id).await? {
            Some(companion) => companions.push(companion_combatant(&companion, profile.level)),
            None => warn!(companion_id, "skipping unknown companion"),
        }
    }

    let new_battle = NewBattle {
        id: Uuid::new_v4(),
        profile_id: profile.id,
        player: player_combatant(&profile),
        enemy: creature_combatant(&creature, level),
        companions,
        location: command.location.clone(),
        flee_allowed: !creature.is_boss,
    };

    // RNG is locked only around synchronous domain calls, never across an await.
    let session = {
        let mut rng_guard = lock_rng(rng)?;
        BattleSession::start(new_battle, clock.now(), &mut *rng_guard)
    };

    store.create_session(&session).await?;

    info!(
        battle_id = %session.id,
        creature_id = %creature.id,
        level,
        "battle initialized"
    );
    Ok(session)
}

/// Looks up everything an action needs from the catalog and the profile.
async fn prepare(
    session: &BattleSession,
    action: &BattleAction,
    store: &dyn BattleStore,
    catalog: &dyn ContentCatalog,
) -> Result<(PreparedAction, Option<Profile>), DomainError> {
    match action {
        BattleAction::Flee => Ok((PreparedAction::Flee, None)),
        BattleAction::Spell { spell_id } => {
            let definition = if spell_id == STRUGGLE_ID {
                None
            } else {
                catalog.get_spell(spell_id).await?
            };
            Ok((
                PreparedAction::Spell {
                    spell_id: spell_id.clone(),
                    definition,
                },
                None,
            ))
        }
        BattleAction::Item { item_id } => {
            let profile = load_profile(store, session.profile_id).await?;
            let definition = catalog.get_item(item_id).await?;
            Ok((
                PreparedAction::Item {
                    item_id: item_id.clone(),
                    definition,
                    owned: profile.item_count(item_id),
                },
                Some(profile),
            ))
        }
    }
}

/// Resolves one action against a loaded session and persists the result.
async fn resolve(
    mut session: BattleSession,
    actor: &str,
    action: &BattleAction,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    store: &dyn BattleStore,
    catalog: &dyn ContentCatalog,
) -> Result<ActionResult, DomainError> {
    let (prepared, profile) = prepare(&session, action, store, catalog).await?;

    let result = {
        let mut rng_guard = lock_rng(rng)?;
        session.execute_action(actor, prepared, clock.now(), &mut *rng_guard)
    };

    if !result.success {
        info!(battle_id = %session.id, actor, reason = %result.message, "action refused");
        return Ok(result);
    }

    let profile = match (action, profile) {
        (BattleAction::Item { item_id }, Some(mut profile)) => {
            profile.consume_item(item_id);
            Some(profile)
        }
        _ => None,
    };

    persist(store, &mut session, profile.as_ref()).await?;

    info!(
        battle_id = %session.id,
        actor,
        phase = ?session.phase,
        battle_ended = result.battle_ended,
        "action resolved"
    );
    Ok(result)
}

/// Handles the `ExecuteAction` command: resolves a spell, item or flee for
/// the named combatant.
///
/// Rule refusals come back as an unsuccessful [`ActionResult`] and persist
/// nothing. A used item is removed from the profile's inventory.
///
/// # Errors
///
/// Returns `DomainError::BattleNotFound`, `DomainError::CorruptSession`,
/// `DomainError::ConcurrencyConflict`, or any persistence error.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, battle_id = %command.battle_id))]
pub async fn handle_execute_action(
    command: &ExecuteAction,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    store: &dyn BattleStore,
    catalog: &dyn ContentCatalog,
    locks: &BattleLocks,
) -> Result<ActionResult, DomainError> {
    let _guard = locks.acquire(command.battle_id).await?;
    let session = load_session(store, command.battle_id).await?;
    resolve(session, &command.actor, &command.action, clock, rng, store, catalog).await
}

/// Handles the `ExecuteAiTurn` command: scores the opponent's spells, picks
/// one, and resolves it on the same path as a submitted action.
///
/// Skipped when either side is already at zero health.
///
/// # Errors
///
/// Returns the same errors as [`handle_execute_action`].
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, battle_id = %command.battle_id))]
pub async fn handle_execute_ai_turn(
    command: &ExecuteAiTurn,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    store: &dyn BattleStore,
    catalog: &dyn ContentCatalog,
    locks: &BattleLocks,
) -> Result<AiTurnReport, DomainError> {
    let _guard = locks.acquire(command.battle_id).await?;
    let session = load_session(store, command.battle_id).await?;

    if session.player.is_defeated() || session.enemy.is_defeated() {
        return Ok(AiTurnReport {
            chosen_spell: None,
            result: ActionResult::failure("The battle has already been decided."),
        });
    }

    let mut spells = Vec::with_capacity(session.enemy.spells.len());
    for spell_id in &session.enemy.spells {
        match catalog.get_spell(spell_id).await? {
            Some(spell) => spells.push(spell),
            None => warn!(spell_id, "opponent knows a spell missing from the catalog"),
        }
    }

    let chosen = {
        let mut rng_guard = lock_rng(rng)?;
        choose_spell(&spells, &session.enemy, &session.player, &mut *rng_guard)
    };

    let actor = session.enemy.name.clone();
    let action = BattleAction::Spell {
        spell_id: chosen.id.clone(),
    };
    let result = resolve(session, &actor, &action, clock, rng, store, catalog).await?;

    Ok(AiTurnReport {
        chosen_spell: Some(chosen.id),
        result,
    })
}

/// Handles the `ProcessTurnEnd` command: ticks every combatant's
/// conditions, advances the turn, and persists.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the battle is already over, plus the
/// load and persistence errors of the other handlers.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, battle_id = %command.battle_id))]
pub async fn handle_process_turn_end(
    command: &ProcessTurnEnd,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    store: &dyn BattleStore,
    locks: &BattleLocks,
) -> Result<TurnEndReport, DomainError> {
    let _guard = locks.acquire(command.battle_id).await?;
    let mut session = load_session(store, command.battle_id).await?;

    let report = {
        let mut rng_guard = lock_rng(rng)?;
        session.end_turn(clock.now(), &mut *rng_guard)?
    };

    persist(store, &mut session, None).await?;

    info!(
        turn = session.turn,
        phase = ?session.phase,
        player_damage = report.player_damage,
        enemy_damage = report.enemy_damage,
        "turn ended"
    );
    Ok(report)
}

/// Handles the `EndBattle` command: finalizes a finished battle and, on
/// victory, rolls rewards and credits them to the profile.
///
/// The finalized session and the credited profile are committed together:
/// either both land or neither does, so a failed write can be retried and a
/// successful one cannot grant rewards twice.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the battle has not reached the
/// matching terminal phase or was already finalized,
/// `DomainError::ProfileNotFound` if a victorious profile is gone, plus the
/// load and persistence errors of the other handlers.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, battle_id = %command.battle_id))]
pub async fn handle_end_battle(
    command: &EndBattle,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    store: &dyn BattleStore,
    catalog: &dyn ContentCatalog,
    locks: &BattleLocks,
) -> Result<BattleSettlement, DomainError> {
    let _guard = locks.acquire(command.battle_id).await?;
    let mut session = load_session(store, command.battle_id).await?;

    session.finalize(command.outcome, clock.now())?;

    let credited = if command.outcome == BattleOutcome::Victory {
        let mut profile = load_profile(store, session.profile_id).await?;
        let creature = match &session.enemy.creature_id {
            Some(creature_id) => catalog.get_creature(creature_id).await?,
            None => None,
        };
        let mut bundle = {
            let mut rng_guard = lock_rng(rng)?;
            roll_rewards(creature.as_ref(), session.enemy.level, &mut *rng_guard)
        };
        apply_rewards(&mut profile, &mut bundle);
        Some((profile, bundle))
    } else {
        None
    };

    persist(store, &mut session, credited.as_ref().map(|(profile, _)| profile)).await?;

    let rewards = match credited {
        Some((_, bundle)) => {
            info!(
                experience = bundle.experience,
                currency = bundle.currency,
                leveled_up = bundle.leveled_up,
                "rewards granted"
            );
            Some(bundle)
        }
        None => None,
    };

    info!(outcome = ?command.outcome, "battle finalized");
    Ok(BattleSettlement {
        battle_id: session.id,
        outcome: command.outcome,
        rewards,
    })
}
