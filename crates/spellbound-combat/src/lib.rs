//! Spellbound: turn-based combat resolution engine.
//!
//! Computes damage, manages status effects and cast resources, orders
//! actions, drives the opposing side, and advances a battle session through
//! its phase state machine. Persistence is reached only through the
//! contracts in [`application::ports`].

pub mod application;
pub mod domain;
