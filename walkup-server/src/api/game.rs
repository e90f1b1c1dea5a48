//! Game controller endpoints: status, device binding, pause

use crate::error::Result;
use crate::game::GameStatus;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindDeviceRequest {
    pub device_id: String,
}

/// GET /game/status
pub async fn status(State(state): State<AppState>) -> Result<Json<GameStatus>> {
    Ok(Json(state.controller.status().await?))
}

/// POST /game/device
pub async fn bind_device(
    State(state): State<AppState>,
    payload: std::result::Result<Json<BindDeviceRequest>, JsonRejection>,
) -> Result<Json<GameStatus>> {
    let Json(req) = payload?;

    state.controller.bind_device(&req.device_id).await?;
    Ok(Json(state.controller.status().await?))
}

/// DELETE /game/device
pub async fn unbind_device(State(state): State<AppState>) -> Result<Json<GameStatus>> {
    state.controller.unbind_device().await?;
    Ok(Json(state.controller.status().await?))
}

/// POST /game/pause
pub async fn pause(State(state): State<AppState>) -> Result<StatusCode> {
    state.controller.pause().await?;
    Ok(StatusCode::NO_CONTENT)
}
