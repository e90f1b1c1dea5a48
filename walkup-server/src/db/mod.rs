//! Database access layer
//!
//! Player store, lineup queue and settings queries.

pub mod lineup;
pub mod players;
pub mod settings;
