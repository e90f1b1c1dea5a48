//! Spotify authorization and device listing
//!
//! `/login` sends the browser to Spotify's consent page; Spotify redirects
//! back to `/callback` with a code that is exchanged for the session.

use crate::error::{Error, Result};
use crate::spotify::DeviceList;
use crate::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Redirect,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub status: String,
}

/// GET /login
pub async fn login(State(state): State<AppState>) -> Result<Redirect> {
    let login_state = state.session.begin_login().await;
    let url = state.spotify.authorize_url(&login_state)?;

    info!("Redirecting to Spotify authorization");
    Ok(Redirect::temporary(&url))
}

/// GET /callback
pub async fn callback(
    State(state): State<AppState>,
    query: std::result::Result<Query<CallbackQuery>, QueryRejection>,
) -> Result<Json<CallbackResponse>> {
    let Query(query) = query?;

    if let Some(reason) = query.error {
        warn!("Spotify authorization denied: {}", reason);
        return Err(Error::Validation(format!("Spotify authorization denied: {}", reason)));
    }

    let login_state = query
        .state
        .ok_or_else(|| Error::Validation("Missing state parameter".to_string()))?;
    if !state.session.finish_login(&login_state).await {
        return Err(Error::Validation("Unknown or reused state parameter".to_string()));
    }

    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::Validation("Missing code parameter".to_string()))?;

    let session = state.spotify.exchange_code(&code).await?;
    state.session.set(session).await;

    Ok(Json(CallbackResponse {
        status: "connected".to_string(),
    }))
}

/// GET /devices
///
/// Same envelope and field names as Spotify's device list.
pub async fn list_devices(State(state): State<AppState>) -> Result<Json<DeviceList>> {
    let token = state.session.access_token(&state.spotify).await?;
    Ok(Json(DeviceList {
        devices: state.spotify.list_devices(&token).await?,
    }))
}
