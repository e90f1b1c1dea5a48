//! Spotify Connect playback dispatcher

use crate::error::Result;
use crate::game::dispatcher::PlaybackDispatcher;
use crate::spotify::client::SpotifyClient;
use crate::spotify::session::SessionStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Plays walk-up songs through the Spotify Web API
///
/// Each play transfers playback to the device first, then starts the track
/// with the start offset in the same request.
pub struct SpotifyDispatcher {
    client: Arc<SpotifyClient>,
    session: SessionStore,
}

impl SpotifyDispatcher {
    pub fn new(client: Arc<SpotifyClient>, session: SessionStore) -> Self {
        Self { client, session }
    }
}

#[async_trait]
impl PlaybackDispatcher for SpotifyDispatcher {
    fn name(&self) -> &'static str {
        "spotify"
    }

    async fn play(&self, device_id: &str, track_ref: &str, start_ms: u32) -> Result<()> {
        let token = self.session.access_token(&self.client).await?;

        self.client.transfer_playback(&token, device_id).await?;
        self.client
            .start_track(&token, device_id, track_ref, start_ms)
            .await?;

        debug!("Spotify playing {} on {} @ {}ms", track_ref, device_id, start_ms);
        Ok(())
    }

    async fn pause(&self, device_id: &str) -> Result<()> {
        let token = self.session.access_token(&self.client).await?;
        self.client.pause(&token, device_id).await
    }
}
