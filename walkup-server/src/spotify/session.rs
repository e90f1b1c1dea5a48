//! Spotify session store
//!
//! Exactly one authorized session per running service, owned here and
//! passed explicitly to whoever needs a token. The session is kept in memory
//! only; a restart requires visiting `/login` again.

use crate::error::{Error, Result};
use crate::spotify::client::SpotifyClient;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Refresh when the access token expires within this many seconds
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// How long a `/login` state value stays redeemable
pub const LOGIN_STATE_TTL_SECS: i64 = 600;

/// Upper bound on outstanding `/login` state values; the oldest is evicted
pub const MAX_PENDING_LOGINS: usize = 32;

/// Tokens obtained from the authorization-code flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifySession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl SpotifySession {
    /// Build a session from a token grant valid for `expires_in` seconds
    pub fn from_grant(access_token: String, refresh_token: Option<String>, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in),
        }
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= chrono::Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    session: Option<SpotifySession>,
    /// OAuth state value -> issue time
    pending_logins: HashMap<String, DateTime<Utc>>,
}

impl SessionState {
    fn prune_logins(&mut self, now: DateTime<Utc>) {
        let ttl = chrono::Duration::seconds(LOGIN_STATE_TTL_SECS);
        self.pending_logins
            .retain(|_, issued_at| now - *issued_at < ttl);

        while self.pending_logins.len() >= MAX_PENDING_LOGINS {
            let oldest = self
                .pending_logins
                .iter()
                .min_by_key(|(_, issued_at)| **issued_at)
                .map(|(login_state, _)| login_state.clone());
            match oldest {
                Some(login_state) => {
                    self.pending_logins.remove(&login_state);
                }
                None => break,
            }
        }
    }
}

/// Shared handle to the service's Spotify session
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, session: SpotifySession) {
        let mut state = self.inner.write().await;
        state.session = Some(session);
        info!("Spotify session stored");
    }

    pub async fn clear(&self) {
        self.inner.write().await.session = None;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.read().await.session.is_some()
    }

    /// Remember a fresh OAuth `state` value for the callback to present
    ///
    /// Values older than [`LOGIN_STATE_TTL_SECS`] are dropped on every call,
    /// and at most [`MAX_PENDING_LOGINS`] are kept.
    pub async fn begin_login(&self) -> String {
        let now = Utc::now();
        let login_state = Uuid::new_v4().simple().to_string();

        let mut state = self.inner.write().await;
        state.prune_logins(now);
        state.pending_logins.insert(login_state.clone(), now);
        login_state
    }

    /// Consume a pending OAuth `state`; false if it was never issued or
    /// has expired
    pub async fn finish_login(&self, login_state: &str) -> bool {
        let mut state = self.inner.write().await;
        state.prune_logins(Utc::now());
        state.pending_logins.remove(login_state).is_some()
    }

    /// A valid access token, refreshed through `client` when close to expiry
    pub async fn access_token(&self, client: &SpotifyClient) -> Result<String> {
        {
            let state = self.inner.read().await;
            match &state.session {
                None => {
                    return Err(Error::Playback(
                        "Spotify is not connected; visit /login".to_string(),
                    ))
                }
                Some(session) if !session.needs_refresh(Utc::now()) => {
                    return Ok(session.access_token.clone());
                }
                Some(_) => {}
            }
        }

        // Re-check under the write lock so concurrent callers refresh once
        let mut state = self.inner.write().await;
        let current = state.session.clone().ok_or_else(|| {
            Error::Playback("Spotify is not connected; visit /login".to_string())
        })?;
        if !current.needs_refresh(Utc::now()) {
            return Ok(current.access_token);
        }

        match client.refresh(&current).await {
            Ok(renewed) => {
                let token = renewed.access_token.clone();
                state.session = Some(renewed);
                Ok(token)
            }
            Err(e) => {
                warn!("Spotify token refresh failed: {}", e);
                Err(e)
            }
        }
    }
}
