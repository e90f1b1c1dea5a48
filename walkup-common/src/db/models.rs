//! Database row models
//!
//! Rows carry identifiers as TEXT exactly as stored. Services parse them
//! into typed ids at their own boundary.

use serde::{Deserialize, Serialize};

/// One row of the `players` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlayerRow {
    pub guid: String,
    pub name: String,
    pub track_ref: String,
    pub start_ms: i64,
    pub active: bool,
}

/// One row of the `lineup` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LineupRow {
    pub position: i64,
    pub player_guid: String,
}

/// Lineup row joined with its player, in batting order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LineupPlayerRow {
    pub position: i64,
    pub player_guid: String,
    pub name: String,
    pub track_ref: String,
    pub start_ms: i64,
    pub active: bool,
}
