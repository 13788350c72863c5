//! Domain error types.
//!
//! These are integrity failures: the caller must treat them as fatal for the
//! request. Rule-level refusals (unknown spell, not enough PP, ...) are not
//! errors; they come back as unsuccessful action results.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No battle session exists for the identifier.
    #[error("battle not found: {0}")]
    BattleNotFound(Uuid),

    /// No player profile exists for the identifier.
    #[error("profile not found: {0}")]
    ProfileNotFound(Uuid),

    /// A persisted session could not be decoded or breaks an invariant.
    #[error("corrupt battle session {battle_id}: {reason}")]
    CorruptSession {
        /// The offending battle.
        battle_id: Uuid,
        /// What was wrong with it.
        reason: String,
    },

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on battle {battle_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The battle that had the conflict.
        battle_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// A request that the current battle state cannot accept.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
