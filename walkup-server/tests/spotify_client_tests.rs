//! Spotify adapter tests against a local mock of the Web API
//!
//! The mock binds 127.0.0.1:0 and records every playback call so tests can
//! assert on the exact requests sent.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Form, Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use walkup_common::config::SpotifySettings;
use walkup_server::error::Error;
use walkup_server::game::PlaybackDispatcher;
use walkup_server::spotify::{
    SessionStore, SpotifyClient, SpotifyConfig, SpotifyDispatcher, SpotifySession,
};

/// base64("cid:secret")
const EXPECTED_BASIC: &str = "Basic Y2lkOnNlY3JldA==";

#[derive(Debug, Clone, PartialEq)]
struct Recorded {
    path: String,
    query: HashMap<String, String>,
    body: Value,
}

#[derive(Clone, Default)]
struct MockState {
    calls: Arc<Mutex<Vec<Recorded>>>,
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Bearer a"))
        .unwrap_or(false)
}

async fn token(headers: HeaderMap, Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(EXPECTED_BASIC) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid_client" })));
    }

    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") if form.get("code").map(String::as_str) == Some("good-code") => (
            StatusCode::OK,
            Json(json!({
                "access_token": "a1",
                "refresh_token": "r1",
                "expires_in": 3600,
                "token_type": "Bearer",
            })),
        ),
        Some("refresh_token") if form.get("refresh_token").map(String::as_str) == Some("r1") => (
            StatusCode::OK,
            Json(json!({ "access_token": "a2", "expires_in": 3600, "token_type": "Bearer" })),
        ),
        _ => (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_grant" }))),
    }
}

async fn devices(headers: HeaderMap) -> impl IntoResponse {
    if !bearer_ok(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "devices": [
                { "id": "dev-1", "name": "Dugout", "is_active": true, "type": "Speaker", "volume_percent": 70 },
                { "id": null, "name": "Restricted", "is_active": false, "type": "TV", "volume_percent": null }
            ]
        })),
    )
}

fn record(state: &MockState, path: &str, query: HashMap<String, String>, body: Value) {
    state.calls.lock().unwrap().push(Recorded {
        path: path.to_string(),
        query,
        body,
    });
}

async fn transfer(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    if !bearer_ok(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    record(&state, "/v1/me/player", HashMap::new(), body);
    StatusCode::NO_CONTENT
}

async fn play(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> StatusCode {
    if !bearer_ok(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    let gone = query.get("device_id").map(String::as_str) == Some("gone");
    record(&state, "/v1/me/player/play", query, body);
    if gone {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn pause(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    record(&state, "/v1/me/player/pause", query, Value::Null);
    StatusCode::NO_CONTENT
}

/// Start the mock and return a client pointed at it
async fn start_mock() -> (Arc<SpotifyClient>, MockState) {
    start_mock_with_secret("secret").await
}

async fn start_mock_with_secret(client_secret: &str) -> (Arc<SpotifyClient>, MockState) {
    let state = MockState::default();
    let app = Router::new()
        .route("/api/token", post(token))
        .route("/v1/me/player/devices", get(devices))
        .route("/v1/me/player", put(transfer))
        .route("/v1/me/player/play", put(play))
        .route("/v1/me/player/pause", put(pause))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = SpotifyConfig::from_settings(&SpotifySettings {
        client_id: Some("cid".to_string()),
        client_secret: Some(client_secret.to_string()),
        redirect_uri: Some("http://127.0.0.1:5731/callback".to_string()),
        api_base_url: Some(base.clone()),
        accounts_base_url: Some(base),
    });

    (Arc::new(SpotifyClient::new(config).unwrap()), state)
}

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_exchange_code_builds_session() {
    let (client, _) = start_mock().await;

    let session = client.exchange_code("good-code").await.unwrap();

    assert_eq!(session.access_token, "a1");
    assert_eq!(session.refresh_token.as_deref(), Some("r1"));
    assert!(session.expires_at > chrono::Utc::now() + chrono::Duration::seconds(3000));
}

#[tokio::test]
async fn test_rejected_code_is_validation_error() {
    let (client, _) = start_mock().await;

    let result = client.exchange_code("bad-code").await;

    assert!(matches!(result, Err(Error::Validation(msg)) if msg.contains("invalid_grant")));
}

#[tokio::test]
async fn test_wrong_client_secret_is_http_error() {
    let (client, _) = start_mock_with_secret("wrong").await;

    let result = client.exchange_code("good-code").await;

    assert!(matches!(result, Err(Error::Http(msg)) if msg.contains("401")));
}

#[tokio::test]
async fn test_unreachable_token_endpoint_is_http_error() {
    // Bind then drop a listener to get a port nobody serves
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let config = SpotifyConfig::from_settings(&SpotifySettings {
        client_id: Some("cid".to_string()),
        client_secret: Some("secret".to_string()),
        redirect_uri: Some("http://127.0.0.1:5731/callback".to_string()),
        api_base_url: Some(base.clone()),
        accounts_base_url: Some(base),
    });
    let client = SpotifyClient::new(config).unwrap();

    let result = client.exchange_code("good-code").await;

    assert!(matches!(result, Err(Error::Http(_))));
}

#[tokio::test]
async fn test_expiring_token_is_refreshed_and_keeps_refresh_token() {
    let (client, _) = start_mock().await;
    let store = SessionStore::new();
    store
        .set(SpotifySession {
            access_token: "a-old".to_string(),
            refresh_token: Some("r1".to_string()),
            expires_at: chrono::Utc::now() + chrono::Duration::seconds(10),
        })
        .await;

    let token = store.access_token(&client).await.unwrap();
    assert_eq!(token, "a2");

    // Fresh token is cached; a second call must not refresh again
    assert_eq!(store.access_token(&client).await.unwrap(), "a2");
}

#[tokio::test]
async fn test_valid_token_is_used_as_is() {
    let (client, _) = start_mock().await;
    let store = SessionStore::new();
    store
        .set(SpotifySession::from_grant("a-live".to_string(), None, 3600))
        .await;

    assert_eq!(store.access_token(&client).await.unwrap(), "a-live");
}

#[tokio::test]
async fn test_list_devices() {
    let (client, _) = start_mock().await;

    let devices = client.list_devices("a1").await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].id.as_deref(), Some("dev-1"));
    assert_eq!(devices[0].device_type, "Speaker");
    assert!(devices[0].is_active);
    assert_eq!(devices[1].id, None);
}

#[tokio::test]
async fn test_unauthorized_device_list_is_playback_error() {
    let (client, _) = start_mock().await;

    let result = client.list_devices("nope").await;

    assert!(matches!(result, Err(Error::Playback(_))));
}

#[tokio::test]
async fn test_dispatcher_transfers_then_plays_with_offset() {
    let (client, mock) = start_mock().await;
    let store = SessionStore::new();
    store
        .set(SpotifySession::from_grant("a1".to_string(), Some("r1".to_string()), 3600))
        .await;
    let dispatcher = SpotifyDispatcher::new(client, store);

    dispatcher.play("dev-1", "4uLU6hMCjMI75M1A2tKUQC", 2_500).await.unwrap();

    let calls = mock.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            Recorded {
                path: "/v1/me/player".to_string(),
                query: HashMap::new(),
                body: json!({ "device_ids": ["dev-1"], "play": false }),
            },
            Recorded {
                path: "/v1/me/player/play".to_string(),
                query: query(&[("device_id", "dev-1")]),
                body: json!({
                    "uris": ["spotify:track:4uLU6hMCjMI75M1A2tKUQC"],
                    "position_ms": 2_500,
                }),
            },
        ]
    );
}

#[tokio::test]
async fn test_dispatcher_reports_non_success_status() {
    let (client, _) = start_mock().await;
    let store = SessionStore::new();
    store
        .set(SpotifySession::from_grant("a1".to_string(), None, 3600))
        .await;
    let dispatcher = SpotifyDispatcher::new(client, store);

    let result = dispatcher.play("gone", "trk", 0).await;

    assert!(matches!(result, Err(Error::Playback(msg)) if msg.contains("not found")));
}

#[tokio::test]
async fn test_dispatcher_without_session_sends_nothing() {
    let (client, mock) = start_mock().await;
    let dispatcher = SpotifyDispatcher::new(client, SessionStore::new());

    let result = dispatcher.play("dev-1", "trk", 0).await;

    assert!(matches!(result, Err(Error::Playback(msg)) if msg.contains("/login")));
    assert!(mock.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_dispatcher_pause() {
    let (client, mock) = start_mock().await;
    let store = SessionStore::new();
    store
        .set(SpotifySession::from_grant("a1".to_string(), None, 3600))
        .await;
    let dispatcher = SpotifyDispatcher::new(client, store);

    dispatcher.pause("dev-1").await.unwrap();

    let calls = mock.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, "/v1/me/player/pause");
    assert_eq!(calls[0].query, query(&[("device_id", "dev-1")]));
}
