//! Spellbound combat engine, HTTP adapter.

pub mod error;
pub mod routes;
pub mod state;
