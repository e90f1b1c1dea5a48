//! walkup-server library
//!
//! Keeps a team's batting order, and on "next batter" plays the walk-up
//! song of the player at the head of the lineup on a Spotify Connect
//! device, then moves that player to the end.

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use walkup_common::events::EventBus;

pub mod api;
pub mod db;
pub mod error;
pub mod game;
pub mod spotify;

use game::GameController;
use spotify::{SessionStore, SpotifyClient};

/// Capacity of the event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub controller: Arc<GameController>,
    pub spotify: Arc<SpotifyClient>,
    pub session: SessionStore,
    pub events: EventBus,
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health::health))
        .route("/build_info", get(api::health::build_info))
        // Spotify authorization
        .route("/login", get(api::auth::login))
        .route("/callback", get(api::auth::callback))
        .route("/devices", get(api::auth::list_devices))
        // Roster
        .route(
            "/players",
            get(api::players::list_players).post(api::players::add_player),
        )
        .route(
            "/players/:id",
            get(api::players::get_player)
                .put(api::players::update_player)
                .delete(api::players::delete_player),
        )
        .route("/players/:id/active", post(api::players::set_player_active))
        // Lineup
        .route(
            "/lineup",
            get(api::lineup::get_lineup).post(api::lineup::set_lineup),
        )
        .route(
            "/lineup/next",
            get(api::lineup::peek_next).post(api::lineup::advance),
        )
        // Game
        .route("/game/status", get(api::game::status))
        .route(
            "/game/device",
            post(api::game::bind_device).delete(api::game::unbind_device),
        )
        .route("/game/pause", post(api::game::pause))
        .route("/events", get(api::sse::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
