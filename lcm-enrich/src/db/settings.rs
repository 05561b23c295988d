//! Settings table accessors
//!
//! Key/value pairs; values are stored as text and parsed on read.

use lcm_common::db::DEFAULT_MAX_LOCK_WAIT_MS;
use lcm_common::{Error, Result};
use sqlx::{Pool, Sqlite};

pub const Z2DATA_API_KEY: &str = "z2data_api_key";
pub const MAX_LOCK_WAIT_MS: &str = "enrich_database_max_lock_wait_ms";

/// Z2Data API key stored in the database, if any
pub async fn get_z2data_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, Z2DATA_API_KEY).await
}

pub async fn set_z2data_api_key(db: &Pool<Sqlite>, key: &str) -> Result<()> {
    set_setting(db, Z2DATA_API_KEY, key).await
}

/// Upper bound for lock-retry loops
///
/// **Default:** 5000 ms
pub async fn get_max_lock_wait_ms(db: &Pool<Sqlite>) -> Result<u64> {
    let value = get_setting::<i64>(db, MAX_LOCK_WAIT_MS)
        .await?
        .unwrap_or(DEFAULT_MAX_LOCK_WAIT_MS);
    Ok(value.max(0) as u64)
}

async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(db)
            .await
            .map_err(Error::Database)?;

    match row.and_then(|(value,)| value) {
        Some(value) => {
            let parsed = value
                .trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting {} failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}
