//! Player roster endpoints

use crate::db::{lineup, players};
use crate::db::players::{Player, PlayerInput};
use crate::error::Result;
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;
use walkup_common::events::{LineupChangeTrigger, PlayerChange, WalkupEvent};

#[derive(Debug, Deserialize)]
pub struct ActiveRequest {
    pub active: bool,
}

fn player_changed(state: &AppState, player_id: Uuid, change: PlayerChange) {
    state.events.emit(WalkupEvent::PlayerChanged {
        player_id,
        change,
        timestamp: chrono::Utc::now(),
    });
}

/// GET /players
pub async fn list_players(State(state): State<AppState>) -> Result<Json<Vec<Player>>> {
    Ok(Json(players::list_players(&state.db).await?))
}

/// POST /players
pub async fn add_player(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PlayerInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Player>)> {
    let Json(input) = payload?;

    let id = players::add_player(&state.db, &input).await?;
    let player = players::get_player(&state.db, id).await?;

    player_changed(&state, id, PlayerChange::Added);
    Ok((StatusCode::CREATED, Json(player)))
}

/// GET /players/:id
pub async fn get_player(
    State(state): State<AppState>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Player>> {
    let Path(id) = path?;
    Ok(Json(players::get_player(&state.db, id).await?))
}

/// PUT /players/:id
///
/// Replaces name, track and start offset; an omitted start offset resets to 0.
pub async fn update_player(
    State(state): State<AppState>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
    payload: std::result::Result<Json<PlayerInput>, JsonRejection>,
) -> Result<Json<Player>> {
    let Path(id) = path?;
    let Json(input) = payload?;

    let player = players::update_player(&state.db, id, &input).await?;

    player_changed(&state, id, PlayerChange::Updated);
    Ok(Json(player))
}

/// POST /players/:id/active
pub async fn set_player_active(
    State(state): State<AppState>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
    payload: std::result::Result<Json<ActiveRequest>, JsonRejection>,
) -> Result<Json<Player>> {
    let Path(id) = path?;
    let Json(req) = payload?;

    let player = players::set_player_active(&state.db, id, req.active).await?;

    player_changed(&state, id, PlayerChange::Updated);
    Ok(Json(player))
}

/// DELETE /players/:id
///
/// Idempotent; always 204.
pub async fn delete_player(
    State(state): State<AppState>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode> {
    let Path(id) = path?;
    if players::delete_player(&state.db, id).await? {
        player_changed(&state, id, PlayerChange::Deleted);
        match lineup::get_order(&state.db).await {
            Ok(order) => state.events.emit(WalkupEvent::LineupChanged {
                order,
                trigger: LineupChangeTrigger::PlayerDeleted,
                timestamp: chrono::Utc::now(),
            }),
            Err(e) => warn!("Player {} deleted but lineup snapshot failed: {}", id, e),
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
