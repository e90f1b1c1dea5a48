//! Game controller
//!
//! Drives "next batter": read the lineup head, dispatch its walk-up song,
//! and rotate the head to the tail only after the dispatch succeeded.
//!
//! States:
//! - `Idle`: no device bound, or nothing in the lineup
//! - `Ready`: device bound and lineup non-empty
//! - `Dispatching`: one advance in flight
//!
//! Advances are serialized by an async mutex held from reading the head
//! until the rotation commits, so two callers can never dispatch the same
//! batter.

use crate::db::{lineup, settings};
use crate::db::lineup::LineupSlot;
use crate::db::players::Player;
use crate::error::{Error, Result};
use crate::game::dispatcher::PlaybackDispatcher;
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use walkup_common::events::{EventBus, LineupChangeTrigger, WalkupEvent};

/// Observable controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    Idle,
    Ready,
    Dispatching,
}

/// Snapshot returned by [`GameController::status`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatus {
    pub state: GameState,
    pub device_id: Option<String>,
    pub next_batter: Option<LineupSlot>,
    pub lineup_length: usize,
}

/// Result of a successful advance
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceOutcome {
    /// Player whose song was dispatched
    pub player: Player,
    pub device_id: String,
    /// Position the player was rotated to; None if the player was deleted
    /// while the dispatch was in flight
    pub new_position: Option<i64>,
}

/// Clears the dispatching flag on drop, including when the advance future
/// is cancelled mid-dispatch
struct DispatchingGuard<'a>(&'a AtomicBool);

impl<'a> DispatchingGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for DispatchingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Lineup-advancing state machine
pub struct GameController {
    db: Pool<Sqlite>,
    dispatcher: Arc<dyn PlaybackDispatcher>,
    events: EventBus,
    dispatch_timeout: Duration,
    device: RwLock<Option<String>>,
    advance_lock: Mutex<()>,
    dispatching: AtomicBool,
}

impl GameController {
    /// Create a controller with no device bound
    pub fn new(
        db: Pool<Sqlite>,
        dispatcher: Arc<dyn PlaybackDispatcher>,
        events: EventBus,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            db,
            dispatcher,
            events,
            dispatch_timeout,
            device: RwLock::new(None),
            advance_lock: Mutex::new(()),
            dispatching: AtomicBool::new(false),
        }
    }

    /// Create a controller and rebind the device persisted by a previous run
    pub async fn restore(
        db: Pool<Sqlite>,
        dispatcher: Arc<dyn PlaybackDispatcher>,
        events: EventBus,
        dispatch_timeout: Duration,
    ) -> Result<Self> {
        let device = settings::get_selected_device(&db).await?;
        if let Some(device_id) = &device {
            info!("Restored playback device {}", device_id);
        }

        let controller = Self::new(db, dispatcher, events, dispatch_timeout);
        *controller.device.write().await = device;
        Ok(controller)
    }

    /// Select the device walk-up songs play on
    pub async fn bind_device(&self, device_id: &str) -> Result<()> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(Error::Validation("Device id must not be empty".to_string()));
        }

        settings::set_selected_device(&self.db, device_id).await?;

        let mut device = self.device.write().await;
        if device.as_deref() != Some(device_id) {
            info!("Playback device bound: {}", device_id);
            *device = Some(device_id.to_string());
            self.events.emit(WalkupEvent::DeviceChanged {
                device_id: Some(device_id.to_string()),
                timestamp: chrono::Utc::now(),
            });
        }
        Ok(())
    }

    /// Forget the selected device; the controller returns to `Idle`
    pub async fn unbind_device(&self) -> Result<()> {
        settings::clear_selected_device(&self.db).await?;

        let mut device = self.device.write().await;
        if device.take().is_some() {
            info!("Playback device unbound");
            self.events.emit(WalkupEvent::DeviceChanged {
                device_id: None,
                timestamp: chrono::Utc::now(),
            });
        }
        Ok(())
    }

    /// Currently bound device
    pub async fn device(&self) -> Option<String> {
        self.device.read().await.clone()
    }

    /// Current state, device and next batter
    pub async fn status(&self) -> Result<GameStatus> {
        let device_id = self.device().await;
        let slots = lineup::list_lineup(&self.db).await?;

        let state = if self.dispatching.load(Ordering::SeqCst) {
            GameState::Dispatching
        } else if device_id.is_some() && !slots.is_empty() {
            GameState::Ready
        } else {
            GameState::Idle
        };

        Ok(GameStatus {
            state,
            device_id,
            lineup_length: slots.len(),
            next_batter: slots.into_iter().next(),
        })
    }

    /// Stop playback on the bound device; the lineup is untouched
    pub async fn pause(&self) -> Result<()> {
        let device_id = self.device().await.ok_or_else(|| {
            Error::Precondition("No playback device selected".to_string())
        })?;

        match tokio::time::timeout(self.dispatch_timeout, self.dispatcher.pause(&device_id)).await {
            Ok(Ok(())) => {
                info!("Paused playback on {}", device_id);
                Ok(())
            }
            Ok(Err(Error::Playback(msg))) => Err(Error::Playback(msg)),
            Ok(Err(e)) => Err(Error::Playback(e.to_string())),
            Err(_) => Err(Error::Playback(format!(
                "Pause timed out after {} ms",
                self.dispatch_timeout.as_millis()
            ))),
        }
    }

    /// Play the next batter's song and move them to the end of the lineup
    ///
    /// Fails with `Precondition` (nothing changed) when no device is bound
    /// or the lineup is empty, and with `Playback` (nothing rotated) when
    /// the dispatcher fails or exceeds the dispatch timeout.
    pub async fn advance(&self) -> Result<AdvanceOutcome> {
        let _serialized = self.advance_lock.lock().await;
        self.advance_locked().await
    }

    /// Bind `device_id`, then advance
    ///
    /// The device is only bound once the lineup is known to be non-empty;
    /// an empty lineup fails with `Precondition` and leaves the previous
    /// binding in place.
    pub async fn advance_on(&self, device_id: &str) -> Result<AdvanceOutcome> {
        let _serialized = self.advance_lock.lock().await;

        if lineup::peek_next(&self.db).await?.is_none() {
            return Err(Error::Precondition("Lineup is empty".to_string()));
        }
        self.bind_device(device_id).await?;

        self.advance_locked().await
    }

    /// Body of an advance; the caller holds `advance_lock`
    async fn advance_locked(&self) -> Result<AdvanceOutcome> {
        let device_id = self.device().await.ok_or_else(|| {
            Error::Precondition("No playback device selected".to_string())
        })?;

        let slot = lineup::peek_next_player(&self.db)
            .await?
            .ok_or_else(|| Error::Precondition("Lineup is empty".to_string()))?;
        let player = slot.player;

        debug!(
            "Dispatching {} ({}) via {} to {}",
            player.name,
            player.track_ref,
            self.dispatcher.name(),
            device_id
        );

        let dispatched = {
            let _flag = DispatchingGuard::set(&self.dispatching);
            tokio::time::timeout(
                self.dispatch_timeout,
                self.dispatcher
                    .play(&device_id, &player.track_ref, player.start_ms),
            )
            .await
        };

        let failure = match dispatched {
            Ok(Ok(())) => None,
            Ok(Err(Error::Playback(msg))) => Some(msg),
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!(
                "Dispatch timed out after {} ms",
                self.dispatch_timeout.as_millis()
            )),
        };

        if let Some(reason) = failure {
            error!("Failed to play walk-up for {}: {}", player.name, reason);
            self.events.emit(WalkupEvent::AdvanceFailed {
                player_id: player.id,
                reason: reason.clone(),
                timestamp: chrono::Utc::now(),
            });
            return Err(Error::Playback(reason));
        }

        let new_position = match lineup::rotate(&self.db, player.id).await {
            Ok(position) => Some(position),
            Err(Error::NotFound(_)) => {
                warn!("Player {} left the lineup during dispatch; nothing to rotate", player.id);
                None
            }
            Err(e) => return Err(e),
        };

        info!("Batter up: {} on {}", player.name, device_id);

        self.events.emit(WalkupEvent::BatterUp {
            player_id: player.id,
            name: player.name.clone(),
            track_ref: player.track_ref.clone(),
            start_ms: player.start_ms,
            device_id: device_id.clone(),
            timestamp: chrono::Utc::now(),
        });
        // The song is already playing; a failed snapshot only costs the event
        match lineup::get_order(&self.db).await {
            Ok(order) => self.events.emit(WalkupEvent::LineupChanged {
                order,
                trigger: LineupChangeTrigger::Rotated,
                timestamp: chrono::Utc::now(),
            }),
            Err(e) => warn!("Lineup rotated but snapshot failed: {}", e),
        }

        Ok(AdvanceOutcome {
            player,
            device_id,
            new_position,
        })
    }
}
