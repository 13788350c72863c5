//! Shared application state.

use std::sync::{Arc, Mutex};

use spellbound_combat::application::locks::BattleLocks;
use spellbound_combat::application::ports::{BattleStore, ContentCatalog};
use spellbound_core::clock::Clock;
use spellbound_core::rng::DeterministicRng;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for timestamps.
    pub clock: Arc<dyn Clock + Send + Sync>,
    /// Random number generator for every probabilistic rule.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// Battle sessions, logs and profiles.
    pub store: Arc<dyn BattleStore>,
    /// Spells, items, creatures and encounter tables.
    pub catalog: Arc<dyn ContentCatalog>,
    /// Per-battle locks serializing mutations.
    pub locks: Arc<BattleLocks>,
}

impl AppState {
    /// Create new application state with a fresh lock registry.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock + Send + Sync>,
        rng: Arc<Mutex<dyn DeterministicRng + Send>>,
        store: Arc<dyn BattleStore>,
        catalog: Arc<dyn ContentCatalog>,
    ) -> Self {
        Self {
            clock,
            rng,
            store,
            catalog,
            locks: Arc::new(BattleLocks::new()),
        }
    }
}
