//! Tests for database initialization
//!
//! Covers automatic creation, reopening an existing file, and the schema
//! constraints the lineup relies on.

use walkup_common::db::init::{init_database, init_memory_database};

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("walkup.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("walkup.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO players (guid, name, track_ref) VALUES ('p1', 'Casey', 't1')")
        .execute(&pool1)
        .await
        .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM players")
        .fetch_one(&pool2.unwrap())
        .await
        .unwrap();
    assert_eq!(count, 1, "Existing rows must survive re-initialization");
}

#[tokio::test]
async fn test_lineup_counter_seeded() {
    let pool = init_memory_database().await.unwrap();

    let next: i64 = sqlx::query_scalar("SELECT next_position FROM lineup_state WHERE id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(next, 0);
}

#[tokio::test]
async fn test_lineup_rejects_unknown_player() {
    let pool = init_memory_database().await.unwrap();

    let result = sqlx::query("INSERT INTO lineup (player_guid, position) VALUES ('ghost', 0)")
        .execute(&pool)
        .await;

    assert!(result.is_err(), "Foreign key must reject dangling lineup rows");
}

#[tokio::test]
async fn test_player_delete_cascades_to_lineup() {
    let pool = init_memory_database().await.unwrap();

    sqlx::query("INSERT INTO players (guid, name, track_ref) VALUES ('p1', 'Casey', 't1')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO lineup (player_guid, position) VALUES ('p1', 0)")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("DELETE FROM players WHERE guid = 'p1'")
        .execute(&pool)
        .await
        .unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lineup")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_negative_start_rejected() {
    let pool = init_memory_database().await.unwrap();

    let result = sqlx::query(
        "INSERT INTO players (guid, name, track_ref, start_ms) VALUES ('p1', 'Casey', 't1', -5)",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err());
}
