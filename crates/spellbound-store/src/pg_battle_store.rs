//! `PostgreSQL` implementation of the `BattleStore` trait.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use spellbound_combat::application::ports::BattleStore;
use spellbound_combat::domain::definitions::Profile;
use spellbound_combat::domain::session::{BattleLogEntry, BattlePhase, BattleSession};
use spellbound_core::error::DomainError;

use crate::error::{StoreError, db};

/// PostgreSQL-backed battle store.
#[derive(Debug, Clone)]
pub struct PgBattleStore {
    pool: PgPool,
}

impl PgBattleStore {
    /// Creates a new `PgBattleStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn phase_label(phase: BattlePhase) -> Result<String, DomainError> {
    let value = serde_json::to_value(phase).map_err(StoreError::from)?;
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| StoreError::InvalidValue(format!("phase {phase:?} is not a string")).into())
}

fn turn_column(turn: u32) -> Result<i32, DomainError> {
    i32::try_from(turn)
        .map_err(|_| StoreError::InvalidValue(format!("turn {turn} out of range")).into())
}

#[async_trait]
impl BattleStore for PgBattleStore {
    async fn get_session(&self, battle_id: Uuid) -> Result<Option<BattleSession>, DomainError> {
        let row = sqlx::query("SELECT snapshot, version FROM battle_sessions WHERE battle_id = $1")
            .bind(battle_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let snapshot: serde_json::Value = row.try_get("snapshot").map_err(db)?;
        let version: i64 = row.try_get("version").map_err(db)?;
        let mut session: BattleSession =
            serde_json::from_value(snapshot).map_err(|e| DomainError::CorruptSession {
                battle_id,
                reason: format!("snapshot does not decode: {e}"),
            })?;
        // The column is authoritative for optimistic concurrency.
        session.version = version;
        Ok(Some(session))
    }

    async fn create_session(&self, session: &BattleSession) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO battle_sessions \
             (battle_id, profile_id, phase, version, snapshot, last_action_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(session.id)
        .bind(session.profile_id)
        .bind(phase_label(session.phase)?)
        .bind(session.version)
        .bind(Json(session))
        .bind(session.last_action_at)
        .execute(&self.pool)
        .await
        .map_err(db)?;

        debug!(battle_id = %session.id, "battle session created");
        Ok(())
    }

    async fn update_session(
        &self,
        session: &BattleSession,
        expected_version: i64,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.acquire().await.map_err(db)?;
        write_session(&mut conn, session, expected_version).await
    }

    async fn append_log_entry(&self, entry: &BattleLogEntry) -> Result<(), DomainError> {
        let mut conn = self.pool.acquire().await.map_err(db)?;
        write_log_entry(&mut conn, entry).await
    }

    async fn battle_log(&self, battle_id: Uuid) -> Result<Vec<BattleLogEntry>, DomainError> {
        let rows: Vec<Json<BattleLogEntry>> = sqlx::query_scalar(
            "SELECT entry FROM battle_log WHERE battle_id = $1 ORDER BY entry_id",
        )
        .bind(battle_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        Ok(rows.into_iter().map(|Json(entry)| entry).collect())
    }

    async fn get_profile(&self, profile_id: Uuid) -> Result<Option<Profile>, DomainError> {
        let row: Option<Json<Profile>> =
            sqlx::query_scalar("SELECT data FROM player_profiles WHERE profile_id = $1")
                .bind(profile_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db)?;
        Ok(row.map(|Json(profile)| profile))
    }

    async fn update_profile(&self, profile: &Profile) -> Result<(), DomainError> {
        let mut conn = self.pool.acquire().await.map_err(db)?;
        write_profile(&mut conn, profile).await
    }

    async fn commit(
        &self,
        session: &BattleSession,
        expected_version: i64,
        entries: &[BattleLogEntry],
        profile: Option<&Profile>,
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        // Dropping `tx` on an early return rolls everything back.
        write_session(&mut tx, session, expected_version).await?;
        for entry in entries {
            write_log_entry(&mut tx, entry).await?;
        }
        if let Some(profile) = profile {
            write_profile(&mut tx, profile).await?;
        }

        tx.commit().await.map_err(db)?;
        debug!(
            battle_id = %session.id,
            version = session.version,
            entries = entries.len(),
            "battle session committed"
        );
        Ok(())
    }
}

async fn write_session(
    conn: &mut PgConnection,
    session: &BattleSession,
    expected_version: i64,
) -> Result<(), DomainError> {
    let result = sqlx::query(
        "UPDATE battle_sessions \
         SET phase = $2, version = $3, snapshot = $4, last_action_at = $5 \
         WHERE battle_id = $1 AND version = $6",
    )
    .bind(session.id)
    .bind(phase_label(session.phase)?)
    .bind(session.version)
    .bind(Json(session))
    .bind(session.last_action_at)
    .bind(expected_version)
    .execute(&mut *conn)
    .await
    .map_err(db)?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let actual: Option<i64> =
        sqlx::query_scalar("SELECT version FROM battle_sessions WHERE battle_id = $1")
            .bind(session.id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(db)?;

    Err(match actual {
        Some(actual) => DomainError::ConcurrencyConflict {
            battle_id: session.id,
            expected: expected_version,
            actual,
        },
        None => DomainError::BattleNotFound(session.id),
    })
}

async fn write_log_entry(
    conn: &mut PgConnection,
    entry: &BattleLogEntry,
) -> Result<(), DomainError> {
    sqlx::query(
        "INSERT INTO battle_log (battle_id, turn, entry, recorded_at) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(entry.battle_id)
    .bind(turn_column(entry.turn)?)
    .bind(Json(entry))
    .bind(entry.recorded_at)
    .execute(&mut *conn)
    .await
    .map_err(db)?;
    Ok(())
}

async fn write_profile(conn: &mut PgConnection, profile: &Profile) -> Result<(), DomainError> {
    sqlx::query(
        "INSERT INTO player_profiles (profile_id, data, updated_at) \
         VALUES ($1, $2, NOW()) \
         ON CONFLICT (profile_id) DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()",
    )
    .bind(profile.id)
    .bind(Json(profile))
    .execute(&mut *conn)
    .await
    .map_err(db)?;
    Ok(())
}
