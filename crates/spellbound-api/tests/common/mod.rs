//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use spellbound_combat::domain::combatant::BaseStats;
use spellbound_combat::domain::definitions::{
    CreatureDefinition, ItemDefinition, Profile, SpellDefinition, SpellTarget,
};
use spellbound_core::clock::Clock;
use spellbound_core::rng::DeterministicRng;
use spellbound_test_support::{FixedClock, InMemoryBattleStore, InMemoryCatalog, MockRng};
use tower::ServiceExt;
use uuid::Uuid;

use spellbound_api::routes;
use spellbound_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock + Send + Sync> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

fn stats(attack: u32, defense: u32, speed: u32) -> BaseStats {
    BaseStats {
        attack,
        defense,
        speed,
        accuracy: 90,
        evasion: 0,
        crit_chance: 0,
    }
}

/// Deals 40 base damage, always hits.
pub fn bolt() -> SpellDefinition {
    SpellDefinition {
        id: "bolt".to_owned(),
        name: "Bolt".to_owned(),
        discipline: None,
        base_damage: Some(40),
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

pub fn bite() -> SpellDefinition {
    SpellDefinition {
        id: "bite".to_owned(),
        name: "Bite".to_owned(),
        base_damage: Some(20),
        ..bolt()
    }
}

pub fn goblin() -> CreatureDefinition {
    CreatureDefinition {
        id: "goblin".to_owned(),
        name: "Goblin".to_owned(),
        discipline: None,
        max_health: 100,
        stats: stats(30, 25, 40),
        spells: vec!["bite".to_owned()],
        experience_yield: Some(40),
        currency_yield: Some(9),
        drop_table: Vec::new(),
        is_boss: false,
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
        stats: stats(50, 25, 60),
        discipline: None,
        spells: vec!["bolt".to_owned()],
        inventory: BTreeMap::from([("potion".to_owned(), 1)]),
        currency: 0,
        companions: Vec::new(),
    }
}

pub fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::new()
        .with_spell(bolt())
        .with_spell(bite())
        .with_item(ItemDefinition {
            id: "potion".to_owned(),
            name: "Potion".to_owned(),
            heal_amount: 30,
            cures: Vec::new(),
            usable_in_battle: true,
        })
        .with_creature(goblin())
}

/// A running app plus handles on its in-memory store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryBattleStore>,
    pub profile: Profile,
}

/// Build the full app router over in-memory stores with a deterministic
/// clock and RNG. Uses the same route structure as `main.rs`.
pub fn build_test_app() -> TestApp {
    let profile = profile();
    let store = Arc::new(InMemoryBattleStore::new().with_profile(profile.clone()));
    let clock = fixed_clock();
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(MockRng));
    let app_state = AppState::new(clock, rng, store.clone(), Arc::new(catalog()));

    TestApp {
        router: routes::app(app_state),
        store,
        profile,
    }
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
