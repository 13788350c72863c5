//! Read-through cache over a [`ContentCatalog`].
//!
//! Reference data does not change while the process runs, so found entries
//! are kept for the lifetime of the cache. Misses are not cached.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use spellbound_core::error::DomainError;
use tracing::debug;

use super::ports::ContentCatalog;
use crate::domain::definitions::{
    CreatureDefinition, EncounterEntry, ItemDefinition, SpellDefinition,
};

#[derive(Debug)]
struct Shelf<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V: Clone> Shelf<V> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn get(&self, key: &str) -> Option<V> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn put(&self, key: &str, value: V) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_owned(), value);
        }
    }

    fn remember(&self, key: &str, found: Option<V>) -> Option<V> {
        if let Some(value) = &found {
            self.put(key, value.clone());
        }
        found
    }
}

/// Caching decorator for any [`ContentCatalog`].
#[derive(Debug)]
pub struct CachedCatalog<C> {
    inner: C,
    spells: Shelf<SpellDefinition>,
    items: Shelf<ItemDefinition>,
    creatures: Shelf<CreatureDefinition>,
    tables: Shelf<Vec<EncounterEntry>>,
}

impl<C: ContentCatalog> CachedCatalog<C> {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            spells: Shelf::new(),
            items: Shelf::new(),
            creatures: Shelf::new(),
            tables: Shelf::new(),
        }
    }

    /// The wrapped catalog.
    #[must_use]
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: ContentCatalog> ContentCatalog for CachedCatalog<C> {
    async fn get_spell(&self, spell_id: &str) -> Result<Option<SpellDefinition>, DomainError> {
        if let Some(hit) = self.spells.get(spell_id) {
            return Ok(Some(hit));
        }
        debug!(spell_id, "spell cache miss");
        let found = self.inner.get_spell(spell_id).await?;
        Ok(self.spells.remember(spell_id, found))
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<ItemDefinition>, DomainError> {
        if let Some(hit) = self.items.get(item_id) {
            return Ok(Some(hit));
        }
        debug!(item_id, "item cache miss");
        let found = self.inner.get_item(item_id).await?;
        Ok(self.items.remember(item_id, found))
    }

    async fn get_creature(
        &self,
        creature_id: &str,
    ) -> Result<Option<CreatureDefinition>, DomainError> {
        if let Some(hit) = self.creatures.get(creature_id) {
            return Ok(Some(hit));
        }
        debug!(creature_id, "creature cache miss");
        let found = self.inner.get_creature(creature_id).await?;
        Ok(self.creatures.remember(creature_id, found))
    }

    async fn encounter_table(&self, location: &str) -> Result<Vec<EncounterEntry>, DomainError> {
        if let Some(hit) = self.tables.get(location) {
            return Ok(hit);
        }
        debug!(location, "encounter table cache miss");
        let table = self.inner.encounter_table(location).await?;
        if !table.is_empty() {
            self.tables.put(location, table.clone());
        }
        Ok(table)
    }
}
