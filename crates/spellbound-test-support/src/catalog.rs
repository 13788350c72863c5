//! Test catalogs: in-memory `ContentCatalog` implementations for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use spellbound_combat::application::ports::ContentCatalog;
use spellbound_combat::domain::definitions::{
    CreatureDefinition, EncounterEntry, ItemDefinition, SpellDefinition,
};
use spellbound_core::error::DomainError;

/// A catalog built up in test code. Counts lookups so cache behaviour can
/// be asserted.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    spells: HashMap<String, SpellDefinition>,
    items: HashMap<String, ItemDefinition>,
    creatures: HashMap<String, CreatureDefinition>,
    encounters: Vec<EncounterEntry>,
    lookups: AtomicUsize,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spell.
    #[must_use]
    pub fn with_spell(mut self, spell: SpellDefinition) -> Self {
        self.spells.insert(spell.id.clone(), spell);
        self
    }

    /// Add an item.
    #[must_use]
    pub fn with_item(mut self, item: ItemDefinition) -> Self {
        self.items.insert(item.id.clone(), item);
        self
    }

    /// Add a creature.
    #[must_use]
    pub fn with_creature(mut self, creature: CreatureDefinition) -> Self {
        self.creatures.insert(creature.id.clone(), creature);
        self
    }

    /// Add an encounter table row.
    #[must_use]
    pub fn with_encounter(mut self, entry: EncounterEntry) -> Self {
        self.encounters.push(entry);
        self
    }

    /// Total number of lookups served.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.lookups.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentCatalog for InMemoryCatalog {
    async fn get_spell(&self, spell_id: &str) -> Result<Option<SpellDefinition>, DomainError> {
        self.count();
        Ok(self.spells.get(spell_id).cloned())
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<ItemDefinition>, DomainError> {
        self.count();
        Ok(self.items.get(item_id).cloned())
    }

    async fn get_creature(
        &self,
        creature_id: &str,
    ) -> Result<Option<CreatureDefinition>, DomainError> {
        self.count();
        Ok(self.creatures.get(creature_id).cloned())
    }

    async fn encounter_table(&self, location: &str) -> Result<Vec<EncounterEntry>, DomainError> {
        self.count();
        Ok(self
            .encounters
            .iter()
            .filter(|e| e.location == location)
            .cloned()
            .collect())
    }
}

/// A catalog that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingCatalog;

#[async_trait]
impl ContentCatalog for FailingCatalog {
    async fn get_spell(&self, _spell_id: &str) -> Result<Option<SpellDefinition>, DomainError> {
        Err(DomainError::Infrastructure("catalog unavailable".into()))
    }

    async fn get_item(&self, _item_id: &str) -> Result<Option<ItemDefinition>, DomainError> {
        Err(DomainError::Infrastructure("catalog unavailable".into()))
    }

    async fn get_creature(
        &self,
        _creature_id: &str,
    ) -> Result<Option<CreatureDefinition>, DomainError> {
        Err(DomainError::Infrastructure("catalog unavailable".into()))
    }

    async fn encounter_table(&self, _location: &str) -> Result<Vec<EncounterEntry>, DomainError> {
        Err(DomainError::Infrastructure("catalog unavailable".into()))
    }
}
