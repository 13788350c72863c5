//! Fixtures shared by the handler tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use spellbound_combat::application::locks::BattleLocks;
use spellbound_combat::domain::combatant::BaseStats;
use spellbound_combat::domain::definitions::{
    CreatureDefinition, DropEntry, EncounterEntry, ItemDefinition, Profile, SpellDefinition,
    SpellTarget,
};
use spellbound_test_support::{FixedClock, InMemoryBattleStore, InMemoryCatalog, MockRng};
use uuid::Uuid;

pub fn fixed_clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
}

pub fn spell(id: &str) -> SpellDefinition {
    SpellDefinition {
        id: id.to_owned(),
        name: id.to_owned(),
        discipline: None,
        base_damage: None,
        accuracy: Some(100),
        cost: None,
        max_resource: None,
        status_effect: None,
        status_chance: 0,
        status_duration: None,
        heal_amount: 0,
        target: SpellTarget::Other,
        crit_bonus: 0,
        priority: 0,
    }
}

pub fn bolt() -> SpellDefinition {
    SpellDefinition {
        base_damage: Some(40),
        ..spell("bolt")
    }
}

pub fn bite() -> SpellDefinition {
    SpellDefinition {
        base_damage: Some(20),
        ..spell("bite")
    }
}

pub fn mend() -> SpellDefinition {
    SpellDefinition {
        heal_amount: 30,
        target: SpellTarget::Caster,
        ..spell("mend")
    }
}

pub fn potion() -> ItemDefinition {
    ItemDefinition {
        id: "potion".to_owned(),
        name: "Potion".to_owned(),
        heal_amount: 30,
        cures: Vec::new(),
        usable_in_battle: true,
    }
}

pub fn goblin() -> CreatureDefinition {
    CreatureDefinition {
        id: "goblin".to_owned(),
        name: "Goblin".to_owned(),
        discipline: None,
        max_health: 100,
        stats: BaseStats {
            attack: 30,
            defense: 25,
            speed: 40,
            accuracy: 90,
            evasion: 0,
            crit_chance: 0,
        },
        spells: vec!["bite".to_owned()],
        experience_yield: Some(40),
        currency_yield: Some(9),
        drop_table: vec![DropEntry {
            item_id: "pelt".to_owned(),
            chance: 50,
            quantity: 1,
        }],
        is_boss: false,
    }
}

pub fn dragon() -> CreatureDefinition {
    CreatureDefinition {
        id: "dragon".to_owned(),
        name: "Dragon".to_owned(),
        is_boss: true,
        ..goblin()
    }
}

pub fn wolf() -> CreatureDefinition {
    CreatureDefinition {
        id: "wolf".to_owned(),
        name: "Wolf".to_owned(),
        ..goblin()
    }
}

pub fn profile() -> Profile {
    Profile {
        id: Uuid::new_v4(),
        name: "Mira".to_owned(),
        level: 1,
        experience: 0,
        experience_to_next: 100,
        max_health: 100,
        stats: BaseStats {
            attack: 50,
            defense: 25,
            speed: 60,
            accuracy: 90,
            evasion: 0,
            crit_chance: 0,
        },
        discipline: None,
        spells: vec!["bolt".to_owned(), "mend".to_owned()],
        inventory: BTreeMap::from([("potion".to_owned(), 1)]),
        currency: 0,
        companions: Vec::new(),
    }
}

pub fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::new()
        .with_spell(bolt())
        .with_spell(bite())
        .with_spell(mend())
        .with_item(potion())
        .with_creature(goblin())
        .with_creature(dragon())
        .with_creature(wolf())
        .with_encounter(EncounterEntry {
            location: "forest".to_owned(),
            creature_id: "goblin".to_owned(),
            weight: 1,
            min_level: 2,
            max_level: 4,
        })
}

/// Everything a handler needs, wired to in-memory doubles.
pub struct Harness {
    pub clock: FixedClock,
    pub rng: Mutex<MockRng>,
    pub store: InMemoryBattleStore,
    pub catalog: InMemoryCatalog,
    pub locks: BattleLocks,
    pub profile: Profile,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_profile(profile())
    }

    pub fn with_profile(profile: Profile) -> Self {
        Self {
            clock: fixed_clock(),
            rng: Mutex::new(MockRng),
            store: InMemoryBattleStore::new().with_profile(profile.clone()),
            catalog: catalog(),
            locks: BattleLocks::new(),
            profile,
        }
    }
}
