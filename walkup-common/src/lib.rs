//! # Walk-Up Common Library
//!
//! Shared code for the walk-up lineup service:
//! - Database schema initialization and row models
//! - Event types (WalkupEvent enum) and the EventBus
//! - Configuration loading and root folder resolution
//! - Common error type

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
