//! Database access for lcm-enrich
//!
//! Free async functions over a shared `SqlitePool`. Ids and timestamps are
//! stored as text (UUID, RFC 3339) and decoded by the helpers below.

pub mod assemblies;
pub mod line_items;
pub mod settings;

use chrono::{DateTime, Utc};
use lcm_common::{Error, Result};
use sqlx::SqlitePool;
use std::path::Path;
use uuid::Uuid;

/// Open the service database in the root folder, creating schema if needed
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::debug!("Connecting to database: {}", db_path.display());
    lcm_common::db::init_database(db_path).await
}

pub(crate) fn parse_uuid(column: &str, raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| Error::CorruptRow(format!("{} '{}' is not a UUID: {}", column, raw, e)))
}

pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::CorruptRow(format!("{} '{}' is not RFC 3339: {}", column, raw, e)))
}

pub(crate) fn parse_count(column: &str, raw: i64) -> Result<usize> {
    usize::try_from(raw)
        .map_err(|_| Error::CorruptRow(format!("{} is negative: {}", column, raw)))
}
