//! walkup-server - Main entry point
//!
//! Walk-up song service: roster, batting order, and "next batter" playback
//! on a Spotify Connect device.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkup_common::config::{load_toml_config, resolve_root_folder, ROOT_FOLDER_ENV};
use walkup_common::db::init_database;
use walkup_common::events::EventBus;
use walkup_server::game::GameController;
use walkup_server::spotify::{SessionStore, SpotifyClient, SpotifyConfig, SpotifyDispatcher};
use walkup_server::{build_router, AppState, EVENT_CHANNEL_CAPACITY};

/// Command-line arguments for walkup-server
#[derive(Parser, Debug)]
#[command(name = "walkup-server")]
#[command(about = "Walk-up song lineup service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "WALKUP_PORT")]
    port: Option<u16>,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Path to walkup.toml
    #[arg(short, long, env = "WALKUP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        load_toml_config(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "walkup_server={0},walkup_common={0},tower_http=debug",
                    toml_config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "walkup-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &toml_config);
    info!("Root folder: {}", root_folder.display());

    let db_path = toml_config.database_path(&root_folder);
    let db = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!("Database: {}", db_path.display());

    let spotify_config = SpotifyConfig::from_settings(&toml_config.spotify.clone().with_env_overrides());
    if !spotify_config.is_configured() {
        warn!("Spotify credentials are not configured; /login and playback will fail");
    }
    let spotify = Arc::new(SpotifyClient::new(spotify_config).context("Failed to create Spotify client")?);
    let session = SessionStore::new();

    let events = EventBus::new(EVENT_CHANNEL_CAPACITY);
    let dispatcher = Arc::new(SpotifyDispatcher::new(spotify.clone(), session.clone()));
    let controller = GameController::restore(
        db.clone(),
        dispatcher,
        events.clone(),
        Duration::from_millis(toml_config.dispatch_timeout_ms),
    )
    .await
    .context("Failed to restore game state")?;

    let app = build_router(AppState {
        db,
        controller: Arc::new(controller),
        spotify,
        session,
        events,
    });

    let port = args.port.unwrap_or(toml_config.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
