//! Error types for walkup-server
//!
//! One enum for the whole service. The first four variants are the domain
//! taxonomy callers are expected to act on; the rest are infrastructure
//! failures.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for walkup-server
#[derive(Error, Debug)]
pub enum Error {
    /// Bad input: empty name, unknown player id in a lineup, ...
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation on an absent player
    #[error("Not found: {0}")]
    NotFound(String),

    /// Advance requested without a bound device or with an empty lineup
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Dispatcher call failed or timed out
    #[error("Playback error: {0}")]
    Playback(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Outbound HTTP failures (Spotify token endpoint, client setup)
    #[error("HTTP error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using walkup-server Error
pub type Result<T> = std::result::Result<T, Error>;

impl From<walkup_common::Error> for Error {
    fn from(err: walkup_common::Error) -> Self {
        use walkup_common::Error as Common;
        match err {
            Common::Database(e) => Error::Database(e),
            Common::Io(e) => Error::Io(e),
            Common::Config(msg) => Error::Config(msg),
            Common::NotFound(msg) => Error::NotFound(msg),
            Common::InvalidInput(msg) => Error::Validation(msg),
            Common::Internal(msg) => Error::Internal(msg),
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl Error {
    /// HTTP status and stable error code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::Precondition(_) => (StatusCode::CONFLICT, "PRECONDITION_FAILED"),
            Error::Playback(_) => (StatusCode::BAD_GATEWAY, "PLAYBACK_ERROR"),
            Error::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Error::Http(_) => (StatusCode::INTERNAL_SERVER_ERROR, "HTTP_ERROR"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
