//! Spellbound combat engine API server entry point.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use spellbound_api::error::AppError;
use spellbound_api::routes;
use spellbound_api::state::AppState;
use spellbound_combat::application::catalog_cache::CachedCatalog;
use spellbound_core::clock::SystemClock;
use spellbound_core::rng::{DeterministicRng, SeededRng};
use spellbound_store::MIGRATOR;
use spellbound_store::pg_battle_store::PgBattleStore;
use spellbound_store::pg_content_catalog::PgContentCatalog;

/// Settings read from the environment.
struct Config {
    database_url: String,
    addr: SocketAddr,
    rng_seed: Option<u64>,
}

impl Config {
    fn from_env() -> Result<Self, AppError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL environment variable must be set".into()))?;
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;
        let addr = format!("{host}:{port}")
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
        let rng_seed = match std::env::var("RNG_SEED") {
            Ok(raw) => Some(
                raw.parse()
                    .map_err(|e| AppError::Config(format!("RNG_SEED must be a valid u64: {e}")))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            addr,
            rng_seed,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Spellbound combat API server");

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    MIGRATOR.run(&pool).await?;

    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = match config.rng_seed {
        Some(seed) => {
            tracing::info!(seed, "using seeded RNG");
            Arc::new(Mutex::new(SeededRng::from_seed(seed)))
        }
        None => Arc::new(Mutex::new(SeededRng::from_entropy())),
    };

    let app_state = AppState::new(
        Arc::new(SystemClock),
        rng,
        Arc::new(PgBattleStore::new(pool.clone())),
        Arc::new(CachedCatalog::new(PgContentCatalog::new(pool))),
    );

    // TODO: Replace CorsLayer::permissive() with an origin allow-list once a client host exists.
    let app = routes::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
