//! Spotify Connect adapter
//!
//! - `client`: stateless Web API calls (OAuth token endpoint, devices, playback)
//! - `session`: the single authorized session, refreshed before expiry
//! - `dispatcher`: [`PlaybackDispatcher`](crate::game::PlaybackDispatcher) backed by the two above

pub mod client;
pub mod dispatcher;
pub mod session;

pub use client::{Device, DeviceList, SpotifyClient, SpotifyConfig};
pub use dispatcher::SpotifyDispatcher;
pub use session::{SessionStore, SpotifySession};
