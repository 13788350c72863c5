//! Spellbound Core: shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that the combat
//! engine and its adapters depend on. It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod rng;
