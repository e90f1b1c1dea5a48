//! HTTP API
//!
//! Handlers are thin: they extract, call the store or the game controller,
//! and publish the matching [`WalkupEvent`](walkup_common::events::WalkupEvent).
//! Errors render through [`Error`](crate::error::Error)'s `IntoResponse`.

pub mod auth;
pub mod game;
pub mod health;
pub mod lineup;
pub mod players;
pub mod sse;
