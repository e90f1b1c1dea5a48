//! Lineup queue
//!
//! Batting order stored as `(player_guid, position)` rows, smallest position
//! first. Positions handed out by [`rotate`] come from a persisted counter
//! in `lineup_state` that only ever grows between two [`set_lineup`] calls,
//! so repeated rotations of different players stay totally ordered.

use crate::db::players::Player;
use crate::error::{Error, Result};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;
use walkup_common::db::{LineupPlayerRow, LineupRow, PlayerRow};

/// A position in the batting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineupEntry {
    pub position: i64,
    pub player_id: Uuid,
}

impl LineupEntry {
    fn from_row(row: LineupRow) -> Result<Self> {
        let player_id = Uuid::parse_str(&row.player_guid).map_err(|e| {
            Error::Internal(format!("Invalid lineup player UUID '{}': {}", row.player_guid, e))
        })?;
        Ok(Self {
            position: row.position,
            player_id,
        })
    }
}

/// Lineup entry with the player's current attributes, for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineupSlot {
    pub position: i64,
    pub player: Player,
}

/// Replace the whole lineup with `ordered_ids`
///
/// Replace, not merge: players missing from `ordered_ids` leave the lineup
/// (they stay on the roster). Positions become `0..n` and the rotation
/// counter restarts at `n`. Every id must name an existing player and
/// appear once; otherwise nothing changes.
pub async fn set_lineup(db: &Pool<Sqlite>, ordered_ids: &[Uuid]) -> Result<()> {
    let mut seen = HashSet::with_capacity(ordered_ids.len());
    for id in ordered_ids {
        if !seen.insert(*id) {
            return Err(Error::Validation(format!(
                "Player {} appears more than once in the lineup",
                id
            )));
        }
    }

    let mut tx = db.begin().await?;

    for id in ordered_ids {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM players WHERE guid = ?)")
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(Error::Validation(format!("Unknown player in lineup: {}", id)));
        }
    }

    sqlx::query("DELETE FROM lineup").execute(&mut *tx).await?;

    for (position, id) in ordered_ids.iter().enumerate() {
        sqlx::query("INSERT INTO lineup (player_guid, position) VALUES (?, ?)")
            .bind(id.to_string())
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("UPDATE lineup_state SET next_position = ? WHERE id = 1")
        .bind(ordered_ids.len() as i64)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!("Lineup set with {} players", ordered_ids.len());
    Ok(())
}

/// Entry with the smallest position
///
/// `None` means no lineup is configured, which is a normal state.
pub async fn peek_next(db: &Pool<Sqlite>) -> Result<Option<LineupEntry>> {
    let row = sqlx::query_as::<_, LineupRow>(
        "SELECT position, player_guid FROM lineup ORDER BY position ASC LIMIT 1",
    )
    .fetch_optional(db)
    .await?;

    row.map(LineupEntry::from_row).transpose()
}

/// Head entry joined with its player
pub async fn peek_next_player(db: &Pool<Sqlite>) -> Result<Option<LineupSlot>> {
    let row = sqlx::query_as::<_, LineupPlayerRow>(
        r#"
        SELECT l.position, l.player_guid, p.name, p.track_ref, p.start_ms, p.active
        FROM lineup l
        JOIN players p ON p.guid = l.player_guid
        ORDER BY l.position ASC
        LIMIT 1
        "#,
    )
    .fetch_optional(db)
    .await?;

    row.map(slot_from_row).transpose()
}

/// All entries in batting order
pub async fn get_entries(db: &Pool<Sqlite>) -> Result<Vec<LineupEntry>> {
    let rows = sqlx::query_as::<_, LineupRow>(
        "SELECT position, player_guid FROM lineup ORDER BY position ASC",
    )
    .fetch_all(db)
    .await?;

    rows.into_iter().map(LineupEntry::from_row).collect()
}

/// Player ids in batting order
pub async fn get_order(db: &Pool<Sqlite>) -> Result<Vec<Uuid>> {
    Ok(get_entries(db)
        .await?
        .into_iter()
        .map(|entry| entry.player_id)
        .collect())
}

/// Full lineup with live player attributes
pub async fn list_lineup(db: &Pool<Sqlite>) -> Result<Vec<LineupSlot>> {
    let rows = sqlx::query_as::<_, LineupPlayerRow>(
        r#"
        SELECT l.position, l.player_guid, p.name, p.track_ref, p.start_ms, p.active
        FROM lineup l
        JOIN players p ON p.guid = l.player_guid
        ORDER BY l.position ASC
        "#,
    )
    .fetch_all(db)
    .await?;

    rows.into_iter().map(slot_from_row).collect()
}

/// Move `player_id` to the end of the lineup
///
/// The new position is strictly greater than every position handed out
/// since the last [`set_lineup`]. Returns the new position.
pub async fn rotate(db: &Pool<Sqlite>, player_id: Uuid) -> Result<i64> {
    let mut tx = db.begin().await?;

    let removed = sqlx::query("DELETE FROM lineup WHERE player_guid = ?")
        .bind(player_id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if removed == 0 {
        return Err(Error::NotFound(format!("Player not in lineup: {}", player_id)));
    }

    // The counter is authoritative; MAX(position) only guards a database
    // edited by hand.
    let position: i64 = sqlx::query_scalar(
        r#"
        SELECT MAX(
            (SELECT next_position FROM lineup_state WHERE id = 1),
            COALESCE((SELECT MAX(position) + 1 FROM lineup), 0)
        )
        "#,
    )
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO lineup (player_guid, position) VALUES (?, ?)")
        .bind(player_id.to_string())
        .bind(position)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE lineup_state SET next_position = ? WHERE id = 1")
        .bind(position + 1)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    debug!("Rotated player {} to position {}", player_id, position);
    Ok(position)
}

fn slot_from_row(row: LineupPlayerRow) -> Result<LineupSlot> {
    let position = row.position;
    let player = Player::from_row(PlayerRow {
        guid: row.player_guid,
        name: row.name,
        track_ref: row.track_ref,
        start_ms: row.start_ms,
        active: row.active,
    })?;
    Ok(LineupSlot { position, player })
}
