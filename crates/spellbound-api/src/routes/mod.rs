//! Route modules.

use axum::Router;

use crate::state::AppState;

pub mod battle;
pub mod health;

/// Assembles every route under its prefix, without middleware.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/battles", battle::router())
        .with_state(state)
}
