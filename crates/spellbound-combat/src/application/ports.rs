//! Persistence contracts the engine depends on.

use async_trait::async_trait;
use spellbound_core::error::DomainError;
use uuid::Uuid;

use crate::domain::definitions::{
    CreatureDefinition, EncounterEntry, ItemDefinition, Profile, SpellDefinition,
};
use crate::domain::session::{BattleLogEntry, BattleSession};

/// Read-write store for battle sessions, their logs, and player profiles.
#[async_trait]
pub trait BattleStore: Send + Sync {
    /// Load a session snapshot. `Ok(None)` when no battle has the ID.
    ///
    /// Implementations return `DomainError::CorruptSession` when a stored
    /// snapshot cannot be decoded.
    async fn get_session(&self, battle_id: Uuid) -> Result<Option<BattleSession>, DomainError>;

    /// Persist a newly opened session at version 0.
    async fn create_session(&self, session: &BattleSession) -> Result<(), DomainError>;

    /// Replace a session snapshot with optimistic concurrency.
    /// `expected_version` is the version the caller loaded; `session.version`
    /// is the version being written.
    async fn update_session(
        &self,
        session: &BattleSession,
        expected_version: i64,
    ) -> Result<(), DomainError>;

    /// Append one battle log entry.
    async fn append_log_entry(&self, entry: &BattleLogEntry) -> Result<(), DomainError>;

    /// All log entries for a battle, oldest first.
    async fn battle_log(&self, battle_id: Uuid) -> Result<Vec<BattleLogEntry>, DomainError>;

    /// Load a player profile. `Ok(None)` when no profile has the ID.
    async fn get_profile(&self, profile_id: Uuid) -> Result<Option<Profile>, DomainError>;

    /// Persist a player profile.
    async fn update_profile(&self, profile: &Profile) -> Result<(), DomainError>;

    /// Atomically write a session snapshot (with the same version check as
    /// [`BattleStore::update_session`]), append `entries`, and persist
    /// `profile` when given. Either every write lands or none does.
    async fn commit(
        &self,
        session: &BattleSession,
        expected_version: i64,
        entries: &[BattleLogEntry],
        profile: Option<&Profile>,
    ) -> Result<(), DomainError>;
}

/// Read-only reference data: spells, items, creatures and encounter tables.
#[async_trait]
pub trait ContentCatalog: Send + Sync {
    /// Look up a spell.
    async fn get_spell(&self, spell_id: &str) -> Result<Option<SpellDefinition>, DomainError>;

    /// Look up an item.
    async fn get_item(&self, item_id: &str) -> Result<Option<ItemDefinition>, DomainError>;

    /// Look up a creature.
    async fn get_creature(
        &self,
        creature_id: &str,
    ) -> Result<Option<CreatureDefinition>, DomainError>;

    /// Encounter table rows for a location, in a stable order.
    async fn encounter_table(&self, location: &str) -> Result<Vec<EncounterEntry>, DomainError>;
}
