//! `PostgreSQL` persistence for the Spellbound combat engine.
//!
//! Sessions and profiles are stored as JSONB snapshots; reference data
//! lives in one table per kind. Schema changes live in the workspace
//! `migrations/` directory.

pub mod error;
pub mod pg_battle_store;
pub mod pg_content_catalog;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");
