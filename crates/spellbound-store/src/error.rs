//! Store error types.

use spellbound_core::error::DomainError;
use thiserror::Error;

/// Failures inside the `PostgreSQL` adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Query or connection failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A value could not be encoded for storage.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value is outside its domain range.
    #[error("invalid stored value: {0}")]
    InvalidValue(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        Self::Infrastructure(err.to_string())
    }
}

/// Maps a `sqlx` failure straight into the domain error space.
pub(crate) fn db(err: sqlx::Error) -> DomainError {
    StoreError::from(err).into()
}
