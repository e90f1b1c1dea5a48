//! Spotify Web API client
//!
//! Holds no session state: every playback call takes the access token to
//! use, and token-endpoint calls return a fresh [`SpotifySession`].
//!
//! Failures of device and playback calls are [`Error::Playback`]. Token
//! endpoint failures are [`Error::Validation`] when Spotify rejects the
//! grant (HTTP 400) and [`Error::Http`] otherwise.

use crate::error::{Error, Result};
use crate::spotify::session::SpotifySession;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};
use walkup_common::config::SpotifySettings;

pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com";
pub const DEFAULT_ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";

/// Scopes needed to list devices and control playback
pub const SCOPES: &str = "user-read-playback-state user-modify-playback-state";

const USER_AGENT: &str = concat!("walkup-server/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Application credentials and endpoint roots
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub api_base_url: String,
    pub accounts_base_url: String,
}

impl SpotifyConfig {
    pub fn from_settings(settings: &SpotifySettings) -> Self {
        Self {
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_uri: settings.redirect_uri.clone(),
            api_base_url: trim_base(settings.api_base_url.as_deref(), DEFAULT_API_BASE_URL),
            accounts_base_url: trim_base(
                settings.accounts_base_url.as_deref(),
                DEFAULT_ACCOUNTS_BASE_URL,
            ),
        }
    }

    /// Client id, secret and redirect URI, or a configuration error naming
    /// the first one missing
    fn require_credentials(&self) -> Result<(&str, &str, &str)> {
        let client_id = required(&self.client_id, "client_id")?;
        let client_secret = required(&self.client_secret, "client_secret")?;
        let redirect_uri = required(&self.redirect_uri, "redirect_uri")?;
        Ok((client_id, client_secret, redirect_uri))
    }

    pub fn is_configured(&self) -> bool {
        self.require_credentials().is_ok()
    }
}

fn trim_base(value: Option<&str>, default: &str) -> String {
    value.unwrap_or(default).trim_end_matches('/').to_string()
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("Spotify {} is not configured", key)))
}

/// A Spotify Connect device as reported by `/v1/me/player/devices`
///
/// Serialized with the Web API's own field names so clients written
/// against Spotify's shape read it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Absent for restricted devices, which cannot be controlled
    pub id: Option<String>,
    pub name: String,
    pub is_active: bool,
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub volume_percent: Option<u8>,
}

/// `{"devices": [...]}` envelope, as Spotify returns it and `/devices` serves it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceList {
    pub devices: Vec<Device>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

/// Turn a bare track id into a `spotify:track:` URI; URIs pass through
pub fn track_uri(track_ref: &str) -> String {
    if track_ref.starts_with("spotify:") {
        track_ref.to_string()
    } else {
        format!("spotify:track:{}", track_ref)
    }
}

/// Spotify Web API client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    config: SpotifyConfig,
}

impl SpotifyClient {
    pub fn new(config: SpotifyConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &SpotifyConfig {
        &self.config
    }

    /// URL of the consent page the user is sent to from `/login`
    pub fn authorize_url(&self, state: &str) -> Result<String> {
        let (client_id, _, redirect_uri) = self.config.require_credentials()?;

        let url = Url::parse_with_params(
            &format!("{}/authorize", self.config.accounts_base_url),
            &[
                ("client_id", client_id),
                ("response_type", "code"),
                ("redirect_uri", redirect_uri),
                ("scope", SCOPES),
                ("state", state),
            ],
        )
        .map_err(|e| Error::Config(format!("Invalid accounts base URL: {}", e)))?;

        Ok(url.into())
    }

    /// Trade an authorization code for a session
    pub async fn exchange_code(&self, code: &str) -> Result<SpotifySession> {
        let (_, _, redirect_uri) = self.config.require_credentials()?;
        let token = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .await?;

        info!("Spotify authorization code exchanged");
        Ok(SpotifySession::from_grant(
            token.access_token,
            token.refresh_token,
            token.expires_in,
        ))
    }

    /// Renew an expiring session
    ///
    /// Spotify may omit a new refresh token; the old one is kept then.
    pub async fn refresh(&self, session: &SpotifySession) -> Result<SpotifySession> {
        let refresh_token = session.refresh_token.as_deref().ok_or_else(|| {
            Error::Playback("Spotify session expired and cannot be refreshed; visit /login".to_string())
        })?;

        let token = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        debug!("Spotify access token refreshed");
        Ok(SpotifySession::from_grant(
            token.access_token,
            token.refresh_token.or_else(|| session.refresh_token.clone()),
            token.expires_in,
        ))
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let (client_id, client_secret, _) = self.config.require_credentials()?;

        let response = self
            .http_client
            .post(format!("{}/api/token", self.config.accounts_base_url))
            .basic_auth(client_id, Some(client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| Error::Http(format!("Spotify token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if status == StatusCode::BAD_REQUEST {
                Error::Validation(format!("Spotify rejected the grant: {}", body))
            } else {
                Error::Http(format!(
                    "Spotify token endpoint returned {}: {}",
                    status.as_u16(),
                    body
                ))
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::Http(format!("Invalid Spotify token response: {}", e)))
    }

    /// Devices visible to the authorized account
    pub async fn list_devices(&self, access_token: &str) -> Result<Vec<Device>> {
        let response = self
            .http_client
            .get(format!("{}/v1/me/player/devices", self.config.api_base_url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(network_error)?;

        let response = ensure_success(response, "device list").await?;
        let body: DeviceList = response
            .json()
            .await
            .map_err(|e| Error::Playback(format!("Invalid Spotify device list: {}", e)))?;

        Ok(body.devices)
    }

    /// Make `device_id` the active device without starting playback
    pub async fn transfer_playback(&self, access_token: &str, device_id: &str) -> Result<()> {
        let response = self
            .http_client
            .put(format!("{}/v1/me/player", self.config.api_base_url))
            .bearer_auth(access_token)
            .json(&json!({ "device_ids": [device_id], "play": false }))
            .send()
            .await
            .map_err(network_error)?;

        ensure_success(response, "transfer playback").await?;
        Ok(())
    }

    /// Start `track_ref` on `device_id` at `position_ms`
    pub async fn start_track(
        &self,
        access_token: &str,
        device_id: &str,
        track_ref: &str,
        position_ms: u32,
    ) -> Result<()> {
        let response = self
            .http_client
            .put(format!("{}/v1/me/player/play", self.config.api_base_url))
            .query(&[("device_id", device_id)])
            .bearer_auth(access_token)
            .json(&json!({
                "uris": [track_uri(track_ref)],
                "position_ms": position_ms,
            }))
            .send()
            .await
            .map_err(network_error)?;

        ensure_success(response, "start playback").await?;
        Ok(())
    }

    pub async fn pause(&self, access_token: &str, device_id: &str) -> Result<()> {
        let response = self
            .http_client
            .put(format!("{}/v1/me/player/pause", self.config.api_base_url))
            .query(&[("device_id", device_id)])
            .bearer_auth(access_token)
            .header(reqwest::header::CONTENT_LENGTH, "0")
            .send()
            .await
            .map_err(network_error)?;

        ensure_success(response, "pause").await?;
        Ok(())
    }
}

fn network_error(e: reqwest::Error) -> Error {
    Error::Playback(format!("Spotify request failed: {}", e))
}

async fn ensure_success(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match status {
        StatusCode::UNAUTHORIZED => format!("Spotify rejected credentials for {}", what),
        StatusCode::NOT_FOUND => format!("Spotify device not found for {}", what),
        _ => format!("Spotify {} failed with status {}", what, status.as_u16()),
    };

    if body.is_empty() {
        Err(Error::Playback(message))
    } else {
        Err(Error::Playback(format!("{}: {}", message, body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> SpotifyConfig {
        SpotifyConfig::from_settings(&SpotifySettings {
            client_id: Some("cid".to_string()),
            client_secret: Some("secret".to_string()),
            redirect_uri: Some("http://127.0.0.1:5731/callback".to_string()),
            api_base_url: None,
            accounts_base_url: Some("https://accounts.example/".to_string()),
        })
    }

    #[test]
    fn test_track_uri() {
        assert_eq!(track_uri("4uLU6hMCjMI75M1A2tKUQC"), "spotify:track:4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(track_uri("spotify:track:abc"), "spotify:track:abc");
    }

    #[test]
    fn test_defaults_and_trailing_slash() {
        let config = configured();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.accounts_base_url, "https://accounts.example");
        assert!(config.is_configured());
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let client = SpotifyClient::new(SpotifyConfig::from_settings(&SpotifySettings::default()))
            .unwrap();

        assert!(!client.config().is_configured());
        assert!(matches!(client.authorize_url("s"), Err(Error::Config(_))));
    }

    #[test]
    fn test_authorize_url_carries_scopes_and_state() {
        let client = SpotifyClient::new(configured()).unwrap();

        let url = Url::parse(&client.authorize_url("xyz").unwrap()).unwrap();
        assert_eq!(url.path(), "/authorize");

        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "cid");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], SCOPES);
        assert_eq!(params["state"], "xyz");
        assert_eq!(params["redirect_uri"], "http://127.0.0.1:5731/callback");
    }

    #[test]
    fn test_device_parses_web_api_shape() {
        let device: Device = serde_json::from_str(
            r#"{"id":"d1","name":"Dugout","is_active":false,"type":"Speaker","volume_percent":80}"#,
        )
        .unwrap();

        assert_eq!(device.id.as_deref(), Some("d1"));
        assert_eq!(device.device_type, "Speaker");
        assert_eq!(device.volume_percent, Some(80));
    }
}
