//! Playback dispatcher capability
//!
//! The game controller only knows how to ask something to play a track on
//! a device. The Spotify adapter implements this; tests plug in fakes.

use crate::error::{Error, Result};
use async_trait::async_trait;

/// Something that can start a track on a playback device
///
/// Implementations return `Error::Playback` on failure. They must not
/// retry internally; the caller decides whether to try again.
#[async_trait]
pub trait PlaybackDispatcher: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Start `track_ref` on `device_id`, `start_ms` milliseconds in
    async fn play(&self, device_id: &str, track_ref: &str, start_ms: u32) -> Result<()>;

    /// Stop whatever is playing on `device_id`
    async fn pause(&self, device_id: &str) -> Result<()> {
        Err(Error::Playback(format!(
            "{} cannot pause {}",
            self.name(),
            device_id
        )))
    }
}
