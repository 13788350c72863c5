//! `PostgreSQL` implementation of the `ContentCatalog` trait.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use spellbound_combat::application::ports::ContentCatalog;
use spellbound_combat::domain::definitions::{
    CreatureDefinition, EncounterEntry, ItemDefinition, SpellDefinition,
};
use spellbound_core::error::DomainError;

use crate::error::{StoreError, db};

/// PostgreSQL-backed reference data.
///
/// The `put_*` methods seed or replace rows; the engine itself only reads.
#[derive(Debug, Clone)]
pub struct PgContentCatalog {
    pool: PgPool,
}

fn level_column(value: i32, column: &str) -> Result<u32, DomainError> {
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidValue(format!("{column} = {value}")).into())
}

fn int_column(value: u32, column: &str) -> Result<i32, DomainError> {
    i32::try_from(value)
        .map_err(|_| StoreError::InvalidValue(format!("{column} = {value}")).into())
}

impl PgContentCatalog {
    /// Creates a new `PgContentCatalog`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces a spell.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on database failure.
    pub async fn put_spell(&self, spell: &SpellDefinition) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO spells (spell_id, data) VALUES ($1, $2) \
             ON CONFLICT (spell_id) DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(&spell.id)
        .bind(Json(spell))
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }

    /// Inserts or replaces an item.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on database failure.
    pub async fn put_item(&self, item: &ItemDefinition) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO items (item_id, data) VALUES ($1, $2) \
             ON CONFLICT (item_id) DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(&item.id)
        .bind(Json(item))
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }

    /// Inserts or replaces a creature.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on database failure.
    pub async fn put_creature(&self, creature: &CreatureDefinition) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO creatures (creature_id, data) VALUES ($1, $2) \
             ON CONFLICT (creature_id) DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(&creature.id)
        .bind(Json(creature))
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }

    /// Appends an encounter table row. The creature must already exist.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on database failure or if a
    /// number does not fit its column.
    pub async fn put_encounter(&self, entry: &EncounterEntry) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO encounter_tables (location, creature_id, weight, min_level, max_level) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&entry.location)
        .bind(&entry.creature_id)
        .bind(int_column(entry.weight, "weight")?)
        .bind(int_column(entry.min_level, "min_level")?)
        .bind(int_column(entry.max_level, "max_level")?)
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn fetch_data<T>(&self, sql: &str, key: &str) -> Result<Option<T>, DomainError>
    where
        T: serde::de::DeserializeOwned + Send + Unpin + 'static,
    {
        let row: Option<Json<T>> = sqlx::query_scalar(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        Ok(row.map(|Json(data)| data))
    }
}

#[async_trait]
impl ContentCatalog for PgContentCatalog {
    async fn get_spell(&self, spell_id: &str) -> Result<Option<SpellDefinition>, DomainError> {
        self.fetch_data("SELECT data FROM spells WHERE spell_id = $1", spell_id)
            .await
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<ItemDefinition>, DomainError> {
        self.fetch_data("SELECT data FROM items WHERE item_id = $1", item_id)
            .await
    }

    async fn get_creature(
        &self,
        creature_id: &str,
    ) -> Result<Option<CreatureDefinition>, DomainError> {
        self.fetch_data("SELECT data FROM creatures WHERE creature_id = $1", creature_id)
            .await
    }

    async fn encounter_table(&self, location: &str) -> Result<Vec<EncounterEntry>, DomainError> {
        let rows = sqlx::query(
            "SELECT location, creature_id, weight, min_level, max_level \
             FROM encounter_tables WHERE location = $1 ORDER BY entry_id",
        )
        .bind(location)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.iter()
            .map(|row| {
                Ok(EncounterEntry {
                    location: row.try_get("location").map_err(db)?,
                    creature_id: row.try_get("creature_id").map_err(db)?,
                    weight: level_column(row.try_get("weight").map_err(db)?, "weight")?,
                    min_level: level_column(row.try_get("min_level").map_err(db)?, "min_level")?,
                    max_level: level_column(row.try_get("max_level").map_err(db)?, "max_level")?,
                })
            })
            .collect()
    }
}
