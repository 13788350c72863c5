//! Routes for battles.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use spellbound_combat::application::command_handlers::{
    self, AiTurnReport, BattleSettlement,
};
use spellbound_combat::application::query_handlers::{self, BattleView};
use spellbound_combat::domain::commands;
use spellbound_combat::domain::session::{
    ActionResult, BattleAction, BattleLogEntry, BattleOutcome, TurnEndReport,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct InitializeBattleRequest {
    /// The player profile.
    pub profile_id: Uuid,
    /// Fight this creature; roll a random encounter when absent.
    #[serde(default)]
    pub creature_id: Option<String>,
    /// Location the encounter table is keyed by.
    pub location: String,
}

/// Request body for POST /{battle_id}/actions.
#[derive(Debug, Deserialize)]
pub struct ExecuteActionRequest {
    /// Display name of the acting combatant.
    pub actor: String,
    /// What to do.
    pub action: BattleAction,
}

/// Request body for POST /{battle_id}/end.
#[derive(Debug, Deserialize)]
pub struct EndBattleRequest {
    /// The terminal outcome being settled.
    pub outcome: BattleOutcome,
}

/// POST /
#[instrument(skip(state, request), fields(profile_id = %request.profile_id))]
async fn initialize_battle(
    State(state): State<AppState>,
    Json(request): Json<InitializeBattleRequest>,
) -> Result<Json<BattleView>, ApiError> {
    let command = commands::InitializeBattle {
        correlation_id: Uuid::new_v4(),
        profile_id: request.profile_id,
        creature_id: request.creature_id,
        location: request.location,
    };

    info!(correlation_id = %command.correlation_id, "handling initialize_battle command");

    let session = command_handlers::handle_initialize_battle(
        &command,
        state.clock.as_ref(),
        &state.rng,
        &*state.store,
        &*state.catalog,
    )
    .await?;

    Ok(Json(BattleView::from(session)))
}

/// POST /{battle_id}/actions
#[instrument(skip(state, request), fields(battle_id = %battle_id, actor = %request.actor))]
async fn execute_action(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
    Json(request): Json<ExecuteActionRequest>,
) -> Result<Json<ActionResult>, ApiError> {
    let command = commands::ExecuteAction {
        correlation_id: Uuid::new_v4(),
        battle_id,
        actor: request.actor,
        action: request.action,
    };

    info!(correlation_id = %command.correlation_id, "handling execute_action command");

    let result = command_handlers::handle_execute_action(
        &command,
        state.clock.as_ref(),
        &state.rng,
        &*state.store,
        &*state.catalog,
        &state.locks,
    )
    .await?;

    Ok(Json(result))
}

/// POST /{battle_id}/ai-turn
#[instrument(skip(state), fields(battle_id = %battle_id))]
async fn execute_ai_turn(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
) -> Result<Json<AiTurnReport>, ApiError> {
    let command = commands::ExecuteAiTurn {
        correlation_id: Uuid::new_v4(),
        battle_id,
    };

    info!(correlation_id = %command.correlation_id, "handling execute_ai_turn command");

    let report = command_handlers::handle_execute_ai_turn(
        &command,
        state.clock.as_ref(),
        &state.rng,
        &*state.store,
        &*state.catalog,
        &state.locks,
    )
    .await?;

    Ok(Json(report))
}

/// POST /{battle_id}/turn-end
#[instrument(skip(state), fields(battle_id = %battle_id))]
async fn process_turn_end(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
) -> Result<Json<TurnEndReport>, ApiError> {
    let command = commands::ProcessTurnEnd {
        correlation_id: Uuid::new_v4(),
        battle_id,
    };

    info!(correlation_id = %command.correlation_id, "handling process_turn_end command");

    let report = command_handlers::handle_process_turn_end(
        &command,
        state.clock.as_ref(),
        &state.rng,
        &*state.store,
        &state.locks,
    )
    .await?;

    Ok(Json(report))
}

/// POST /{battle_id}/end
#[instrument(skip(state, request), fields(battle_id = %battle_id))]
async fn end_battle(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
    Json(request): Json<EndBattleRequest>,
) -> Result<Json<BattleSettlement>, ApiError> {
    let command = commands::EndBattle {
        correlation_id: Uuid::new_v4(),
        battle_id,
        outcome: request.outcome,
    };

    info!(correlation_id = %command.correlation_id, "handling end_battle command");

    let settlement = command_handlers::handle_end_battle(
        &command,
        state.clock.as_ref(),
        &state.rng,
        &*state.store,
        &*state.catalog,
        &state.locks,
    )
    .await?;

    Ok(Json(settlement))
}

/// GET /{battle_id}
async fn get_battle(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
) -> Result<Json<BattleView>, ApiError> {
    let view = query_handlers::get_battle(battle_id, &*state.store).await?;
    Ok(Json(view))
}

/// GET /{battle_id}/log
async fn get_battle_log(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
) -> Result<Json<Vec<BattleLogEntry>>, ApiError> {
    let log = query_handlers::get_battle_log(battle_id, &*state.store).await?;
    Ok(Json(log))
}

/// Returns the router for battles.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(initialize_battle))
        .route("/{battle_id}", get(get_battle))
        .route("/{battle_id}/log", get(get_battle_log))
        .route("/{battle_id}/actions", post(execute_action))
        .route("/{battle_id}/ai-turn", post(execute_ai_turn))
        .route("/{battle_id}/turn-end", post(process_turn_end))
        .route("/{battle_id}/end", post(end_battle))
}
