//! Player store
//!
//! Durable roster of walk-up song assignments. The store owns player
//! identity and existence; the lineup only ever refers to a player by id.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info};
use uuid::Uuid;
use walkup_common::db::PlayerRow;

/// A roster entry with its walk-up song
///
/// Serialized as `id`, `name`, `spotify_track_id`, `start_ms`, `active`,
/// the field names the roster UI reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    /// Opaque external track id (a Spotify track id in practice)
    #[serde(rename = "spotify_track_id")]
    pub track_ref: String,
    /// Offset into the track where the walk-up starts
    pub start_ms: u32,
    pub active: bool,
}

impl Player {
    /// Convert from database row to typed player
    pub(crate) fn from_row(row: PlayerRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.guid)
            .map_err(|e| Error::Internal(format!("Invalid player UUID '{}': {}", row.guid, e)))?;
        let start_ms = u32::try_from(row.start_ms).map_err(|_| {
            Error::Internal(format!("Invalid start offset {} for player {}", row.start_ms, id))
        })?;

        Ok(Self {
            id,
            name: row.name,
            track_ref: row.track_ref,
            start_ms,
            active: row.active,
        })
    }
}

/// Fields supplied when adding or editing a player
///
/// The track is accepted as `trackRef`, `spotifyTrackId` or
/// `spotify_track_id`; the offset as `startMs` or `start_ms`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInput {
    pub name: String,
    #[serde(alias = "spotifyTrackId", alias = "spotify_track_id")]
    pub track_ref: String,
    #[serde(default, alias = "start_ms")]
    pub start_ms: Option<i64>,
}

impl PlayerInput {
    pub fn new(name: impl Into<String>, track_ref: impl Into<String>, start_ms: Option<i64>) -> Self {
        Self {
            name: name.into(),
            track_ref: track_ref.into(),
            start_ms,
        }
    }

    /// Trim and check the fields
    ///
    /// Name and track must be non-empty; the start offset defaults to 0 and
    /// must fit in a non-negative 32-bit millisecond count.
    fn validate(&self) -> Result<(String, String, u32)> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Player name must not be empty".to_string()));
        }

        let track_ref = self.track_ref.trim();
        if track_ref.is_empty() {
            return Err(Error::Validation("Track reference must not be empty".to_string()));
        }

        let start_ms = self.start_ms.unwrap_or(0);
        let start_ms = u32::try_from(start_ms).map_err(|_| {
            Error::Validation(format!(
                "Start offset must be a non-negative millisecond count, got {}",
                start_ms
            ))
        })?;

        Ok((name.to_string(), track_ref.to_string(), start_ms))
    }
}

/// Add a player to the roster
///
/// New players start active.
pub async fn add_player(db: &Pool<Sqlite>, input: &PlayerInput) -> Result<Uuid> {
    let (name, track_ref, start_ms) = input.validate()?;
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO players (guid, name, track_ref, start_ms, active)
        VALUES (?, ?, ?, ?, 1)
        "#,
    )
    .bind(id.to_string())
    .bind(&name)
    .bind(&track_ref)
    .bind(i64::from(start_ms))
    .execute(db)
    .await?;

    info!("Added player {} ({}) with track {} @ {}ms", name, id, track_ref, start_ms);
    Ok(id)
}

/// All players in insertion order
///
/// This is roster order, not batting order. Batting order comes from the
/// lineup.
pub async fn list_players(db: &Pool<Sqlite>) -> Result<Vec<Player>> {
    let rows = sqlx::query_as::<_, PlayerRow>(
        r#"
        SELECT guid, name, track_ref, start_ms, active
        FROM players
        ORDER BY rowid ASC
        "#,
    )
    .fetch_all(db)
    .await?;

    rows.into_iter().map(Player::from_row).collect()
}

/// Get a single player by ID
pub async fn get_player(db: &Pool<Sqlite>, id: Uuid) -> Result<Player> {
    let row = sqlx::query_as::<_, PlayerRow>(
        r#"
        SELECT guid, name, track_ref, start_ms, active
        FROM players
        WHERE guid = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Player not found: {}", id)))?;

    Player::from_row(row)
}

/// Overwrite a player's name, track and start offset
///
/// Replace, not merge: all three fields are written, and a missing start
/// offset resets it to 0. The active flag is left alone.
pub async fn update_player(db: &Pool<Sqlite>, id: Uuid, input: &PlayerInput) -> Result<Player> {
    let (name, track_ref, start_ms) = input.validate()?;

    let result = sqlx::query(
        r#"
        UPDATE players
        SET name = ?, track_ref = ?, start_ms = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(&name)
    .bind(&track_ref)
    .bind(i64::from(start_ms))
    .bind(id.to_string())
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Player not found: {}", id)));
    }

    info!("Updated player {} ({})", name, id);
    get_player(db, id).await
}

/// Mark a player active (roster) or inactive (bench)
pub async fn set_player_active(db: &Pool<Sqlite>, id: Uuid, active: bool) -> Result<Player> {
    let result = sqlx::query(
        "UPDATE players SET active = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
    )
    .bind(active)
    .bind(id.to_string())
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Player not found: {}", id)));
    }

    debug!("Player {} active = {}", id, active);
    get_player(db, id).await
}

/// Delete a player and every lineup entry that references it
///
/// Idempotent: deleting an absent player is a no-op. Returns whether a
/// player was actually removed.
pub async fn delete_player(db: &Pool<Sqlite>, id: Uuid) -> Result<bool> {
    let mut tx = db.begin().await?;

    let lineup_rows = sqlx::query("DELETE FROM lineup WHERE player_guid = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let removed = sqlx::query("DELETE FROM players WHERE guid = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected()
        > 0;

    tx.commit().await?;

    if removed {
        info!("Deleted player {} ({} lineup entries removed)", id, lineup_rows);
    } else {
        debug!("Delete of absent player {} ignored", id);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use walkup_common::db::init_memory_database;

    async fn setup_test_db() -> Pool<Sqlite> {
        init_memory_database().await.unwrap()
    }

    #[tokio::test]
    async fn test_add_and_list_in_insertion_order() {
        let db = setup_test_db().await;

        let a = add_player(&db, &PlayerInput::new("Alvarez", "trk-a", Some(15_000)))
            .await
            .unwrap();
        let b = add_player(&db, &PlayerInput::new("Betts", "trk-b", None))
            .await
            .unwrap();

        let players = list_players(&db).await.unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].id, a);
        assert_eq!(players[0].start_ms, 15_000);
        assert!(players[0].active);
        assert_eq!(players[1].id, b);
        assert_eq!(players[1].start_ms, 0, "start offset defaults to 0");
    }

    #[tokio::test]
    async fn test_add_trims_fields() {
        let db = setup_test_db().await;

        let id = add_player(&db, &PlayerInput::new("  Judge ", " trk-j ", Some(0)))
            .await
            .unwrap();
        let player = get_player(&db, id).await.unwrap();
        assert_eq!(player.name, "Judge");
        assert_eq!(player.track_ref, "trk-j");
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_input() {
        let db = setup_test_db().await;

        let empty_name = add_player(&db, &PlayerInput::new("   ", "trk", None)).await;
        assert!(matches!(empty_name, Err(Error::Validation(_))));

        let empty_track = add_player(&db, &PlayerInput::new("Ohtani", "", None)).await;
        assert!(matches!(empty_track, Err(Error::Validation(_))));

        let negative = add_player(&db, &PlayerInput::new("Ohtani", "trk", Some(-1))).await;
        assert!(matches!(negative, Err(Error::Validation(_))));

        assert!(list_players(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_overwrites_all_fields() {
        let db = setup_test_db().await;
        let id = add_player(&db, &PlayerInput::new("Soto", "trk-1", Some(30_000)))
            .await
            .unwrap();

        let updated = update_player(&db, id, &PlayerInput::new("Juan Soto", "trk-2", None))
            .await
            .unwrap();

        assert_eq!(updated.name, "Juan Soto");
        assert_eq!(updated.track_ref, "trk-2");
        assert_eq!(updated.start_ms, 0, "omitted start offset resets to 0");
    }

    #[tokio::test]
    async fn test_update_missing_player_is_not_found() {
        let db = setup_test_db().await;

        let result = update_player(&db, Uuid::new_v4(), &PlayerInput::new("X", "t", None)).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_active_flag() {
        let db = setup_test_db().await;
        let id = add_player(&db, &PlayerInput::new("Trout", "trk", None))
            .await
            .unwrap();

        let benched = set_player_active(&db, id, false).await.unwrap();
        assert!(!benched.active);

        let result = set_player_active(&db, Uuid::new_v4(), true).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let db = setup_test_db().await;
        let id = add_player(&db, &PlayerInput::new("Harper", "trk", None))
            .await
            .unwrap();

        assert!(delete_player(&db, id).await.unwrap());
        assert!(!delete_player(&db, id).await.unwrap());

        assert!(list_players(&db).await.unwrap().is_empty());
        assert!(matches!(get_player(&db, id).await, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_player_json_field_names() {
        let player = Player {
            id: Uuid::nil(),
            name: "Ortiz".to_string(),
            track_ref: "trk-o".to_string(),
            start_ms: 4_000,
            active: true,
        };

        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json["spotify_track_id"], "trk-o");
        assert_eq!(json["start_ms"], 4_000);
        assert!(json.get("trackRef").is_none());
    }

    #[test]
    fn test_input_accepts_both_spellings() {
        let camel: PlayerInput =
            serde_json::from_str(r#"{"name":"A","spotifyTrackId":"t1","startMs":5}"#).unwrap();
        assert_eq!(camel.track_ref, "t1");
        assert_eq!(camel.start_ms, Some(5));

        let snake: PlayerInput =
            serde_json::from_str(r#"{"name":"A","spotify_track_id":"t2","start_ms":6}"#).unwrap();
        assert_eq!(snake.track_ref, "t2");
        assert_eq!(snake.start_ms, Some(6));
    }
}
