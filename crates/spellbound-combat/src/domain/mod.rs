//! Pure combat rules and the battle session aggregate.
//!
//! Nothing in here performs I/O. Probabilistic functions take an injected
//! `DeterministicRng`.

pub mod combatant;
pub mod commands;
pub mod damage;
pub mod decision;
pub mod definitions;
pub mod discipline;
pub mod encounter;
pub mod resources;
pub mod rewards;
pub mod session;
pub mod status;
pub mod turn_order;
