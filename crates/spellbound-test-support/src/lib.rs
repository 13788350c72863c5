//! Shared test doubles and utilities for the Spellbound combat engine.

mod catalog;
mod clock;
mod rng;
mod store;

pub use catalog::{FailingCatalog, InMemoryCatalog};
pub use clock::FixedClock;
pub use rng::{ConstantRng, MockRng, SequenceRng};
pub use store::{FailingBattleStore, InMemoryBattleStore};
