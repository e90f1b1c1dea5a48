//! Event types for the walk-up event system
//!
//! Events are broadcast via [`EventBus`] and serialized for SSE transmission.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Walk-up service events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WalkupEvent {
    /// Batting order replaced or rotated
    LineupChanged {
        /// Player ids in batting order after the change
        order: Vec<Uuid>,
        trigger: LineupChangeTrigger,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A walk-up song was dispatched for the next batter
    BatterUp {
        player_id: Uuid,
        name: String,
        track_ref: String,
        start_ms: u32,
        device_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Advance attempted but the dispatcher failed; lineup unchanged
    AdvanceFailed {
        player_id: Uuid,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback device bound or unbound
    DeviceChanged {
        device_id: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Player added, edited or deleted
    PlayerChanged {
        player_id: Uuid,
        change: PlayerChange,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl WalkupEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            WalkupEvent::LineupChanged { .. } => "LineupChanged",
            WalkupEvent::BatterUp { .. } => "BatterUp",
            WalkupEvent::AdvanceFailed { .. } => "AdvanceFailed",
            WalkupEvent::DeviceChanged { .. } => "DeviceChanged",
            WalkupEvent::PlayerChanged { .. } => "PlayerChanged",
        }
    }
}

/// Why the lineup changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum LineupChangeTrigger {
    /// Whole lineup replaced by the user
    Replaced,
    /// Head moved to the tail after a successful dispatch
    Rotated,
    /// A player in the lineup was deleted
    PlayerDeleted,
}

/// What happened to a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PlayerChange {
    Added,
    Updated,
    Deleted,
}

/// Broadcast bus for [`WalkupEvent`]s
///
/// Cloning shares the underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WalkupEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per receiver
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<WalkupEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all current subscribers
    ///
    /// Having no subscribers is normal (no UI connected) and not an error.
    pub fn emit(&self, event: WalkupEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of connected subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let event = WalkupEvent::DeviceChanged {
            device_id: Some("kitchen".to_string()),
            timestamp: chrono::Utc::now(),
        };
        bus.emit(event.clone());

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(WalkupEvent::DeviceChanged {
            device_id: None,
            timestamp: chrono::Utc::now(),
        });
    }

    #[test]
    fn test_serialized_events_are_tagged() {
        let event = WalkupEvent::LineupChanged {
            order: vec![],
            trigger: LineupChangeTrigger::Rotated,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "LineupChanged");
        assert_eq!(json["trigger"], "Rotated");
        assert_eq!(event.event_type(), "LineupChanged");
    }
}
