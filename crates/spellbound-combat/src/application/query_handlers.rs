//! Query handlers for the combat engine.
//!
//! Read-only views of persisted battles. Queries take no battle lock.

use chrono::{DateTime, Utc};
use serde::Serialize;
use spellbound_core::error::DomainError;
use uuid::Uuid;

use crate::application::command_handlers::load_session;
use crate::application::ports::BattleStore;
use crate::domain::combatant::Combatant;
use crate::domain::session::{BattleLogEntry, BattlePhase, BattleSession};

/// Read-only view of a battle session.
#[derive(Debug, Clone, Serialize)]
pub struct BattleView {
    /// The battle identifier.
    pub battle_id: Uuid,
    /// The owning profile.
    pub profile_id: Uuid,
    /// Current phase.
    pub phase: BattlePhase,
    /// Turn number.
    pub turn: u32,
    /// Names, fastest first.
    pub turn_order: Vec<String>,
    /// The player.
    pub player: Combatant,
    /// The opponent.
    pub enemy: Combatant,
    /// Allies of the player.
    pub companions: Vec<Combatant>,
    /// Where the battle takes place.
    pub location: String,
    /// Whether escaping is possible.
    pub flee_allowed: bool,
    /// Whether rewards have been settled.
    pub finalized: bool,
    /// When the session last changed.
    pub last_action_at: DateTime<Utc>,
    /// Persisted version.
    pub version: i64,
}

impl From<BattleSession> for BattleView {
    fn from(session: BattleSession) -> Self {
        Self {
            battle_id: session.id,
            profile_id: session.profile_id,
            phase: session.phase,
            turn: session.turn,
            turn_order: session.turn_order,
            player: session.player,
            enemy: session.enemy,
            companions: session.companions,
            location: session.location,
            flee_allowed: session.flee_allowed,
            finalized: session.finalized,
            last_action_at: session.last_action_at,
            version: session.version,
        }
    }
}

/// Retrieves a battle by its identifier.
///
/// # Errors
///
/// Returns `DomainError::BattleNotFound` if no session exists for the ID.
/// Returns `DomainError::CorruptSession` if the snapshot is unusable.
pub async fn get_battle(battle_id: Uuid, store: &dyn BattleStore) -> Result<BattleView, DomainError> {
    let session = load_session(store, battle_id).await?;
    Ok(BattleView::from(session))
}

/// Retrieves a battle's log, oldest entry first.
///
/// # Errors
///
/// Returns `DomainError::BattleNotFound` if no session exists for the ID.
pub async fn get_battle_log(
    battle_id: Uuid,
    store: &dyn BattleStore,
) -> Result<Vec<BattleLogEntry>, DomainError> {
    if store.get_session(battle_id).await?.is_none() {
        return Err(DomainError::BattleNotFound(battle_id));
    }
    store.battle_log(battle_id).await
}
