//! Settings database access
//!
//! Read/write settings from the settings table (key-value store).

use crate::error::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

const SELECTED_DEVICE_KEY: &str = "selected_device_id";

/// Get the playback device chosen for the game, if any
pub async fn get_selected_device(db: &Pool<Sqlite>) -> Result<Option<String>> {
    let device = get_setting::<String>(db, SELECTED_DEVICE_KEY).await?;
    Ok(device.filter(|d| !d.is_empty()))
}

/// Persist the playback device chosen for the game
pub async fn set_selected_device(db: &Pool<Sqlite>, device_id: &str) -> Result<()> {
    set_setting(db, SELECTED_DEVICE_KEY, device_id).await
}

/// Forget the selected playback device
pub async fn clear_selected_device(db: &Pool<Sqlite>) -> Result<()> {
    sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(SELECTED_DEVICE_KEY)
        .execute(db)
        .await?;
    Ok(())
}

/// Generic setting getter
///
/// Returns None if the key is missing or NULL.
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(db)
            .await?;

    match value.flatten() {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter
///
/// Inserts or updates setting in database.
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use walkup_common::db::init_memory_database;

    #[tokio::test]
    async fn test_selected_device_roundtrip() {
        let db = init_memory_database().await.unwrap();

        assert_eq!(get_selected_device(&db).await.unwrap(), None);

        set_selected_device(&db, "dugout-speaker").await.unwrap();
        assert_eq!(
            get_selected_device(&db).await.unwrap().as_deref(),
            Some("dugout-speaker")
        );

        set_selected_device(&db, "pa-system").await.unwrap();
        assert_eq!(
            get_selected_device(&db).await.unwrap().as_deref(),
            Some("pa-system")
        );

        clear_selected_device(&db).await.unwrap();
        assert_eq!(get_selected_device(&db).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unparseable_setting_is_config_error() {
        let db = init_memory_database().await.unwrap();
        set_setting(&db, "dispatch_retries", "many").await.unwrap();

        let result = get_setting::<u32>(&db, "dispatch_retries").await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
