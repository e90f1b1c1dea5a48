//! Lineup endpoints

use crate::db::lineup::{self, LineupSlot};
use crate::error::Result;
use crate::game::AdvanceOutcome;
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use walkup_common::events::{LineupChangeTrigger, WalkupEvent};

#[derive(Debug, Deserialize)]
pub struct SetLineupRequest {
    pub order: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct NextBatterResponse {
    pub next: Option<LineupSlot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceQuery {
    /// Bind this device before advancing
    #[serde(default)]
    pub device_id: Option<String>,
}

/// GET /lineup
pub async fn get_lineup(State(state): State<AppState>) -> Result<Json<Vec<LineupSlot>>> {
    Ok(Json(lineup::list_lineup(&state.db).await?))
}

/// POST /lineup
///
/// Replaces the whole batting order. Players left out drop out of the
/// lineup but stay on the roster.
pub async fn set_lineup(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SetLineupRequest>, JsonRejection>,
) -> Result<Json<Vec<LineupSlot>>> {
    let Json(req) = payload?;

    lineup::set_lineup(&state.db, &req.order).await?;

    state.events.emit(WalkupEvent::LineupChanged {
        order: req.order,
        trigger: LineupChangeTrigger::Replaced,
        timestamp: chrono::Utc::now(),
    });

    Ok(Json(lineup::list_lineup(&state.db).await?))
}

/// GET /lineup/next
pub async fn peek_next(State(state): State<AppState>) -> Result<Json<NextBatterResponse>> {
    Ok(Json(NextBatterResponse {
        next: lineup::peek_next_player(&state.db).await?,
    }))
}

/// POST /lineup/next
///
/// `?deviceId=` binds that device first, but only when there is a batter
/// to play.
pub async fn advance(
    State(state): State<AppState>,
    query: std::result::Result<Query<AdvanceQuery>, QueryRejection>,
) -> Result<Json<AdvanceOutcome>> {
    let Query(query) = query?;

    let outcome = match query.device_id.as_deref() {
        Some(device_id) => state.controller.advance_on(device_id).await?,
        None => state.controller.advance().await?,
    };
    Ok(Json(outcome))
}
