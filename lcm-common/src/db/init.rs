//! Database initialization
//!
//! Opens (or creates) the SQLite database and creates the tables used by the
//! enrichment service. Every `CREATE` is idempotent, so this runs on each
//! startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Default upper bound for lock-retry loops, in milliseconds
pub const DEFAULT_MAX_LOCK_WAIT_MS: i64 = 5000;

/// Open the database at `db_path`, creating file and schema if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets the SSE/status readers run while a batch writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 250")
        .execute(&pool)
        .await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and default settings on an open pool
///
/// Also used by tests against `sqlite::memory:`.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    create_settings_table(pool).await?;
    create_assemblies_table(pool).await?;
    create_bom_line_items_table(pool).await?;
    init_default_settings(pool).await?;

    info!("Database tables initialized (settings, assemblies, bom_line_items)");
    Ok(())
}

pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_assemblies_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assemblies (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            customer TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'Draft',
            line_item_count INTEGER NOT NULL DEFAULT 0,
            total_quantity INTEGER NOT NULL DEFAULT 0,
            enrichment_status TEXT NOT NULL DEFAULT 'not_started',
            enriched_count INTEGER NOT NULL DEFAULT 0,
            enrichable_total INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_bom_line_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bom_line_items (
            id TEXT PRIMARY KEY,
            assembly_id TEXT NOT NULL REFERENCES assemblies(id) ON DELETE CASCADE,
            line_number INTEGER NOT NULL,
            section TEXT NOT NULL DEFAULT '',
            value TEXT NOT NULL DEFAULT '',
            shorttext TEXT NOT NULL DEFAULT '',
            quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
            supplier1_name TEXT,
            supplier1_order_number TEXT,
            supplier2_name TEXT,
            supplier2_order_number TEXT,
            z2data_part_id TEXT,
            z2data_manufacturer TEXT,
            z2data_description TEXT,
            z2data_lifecycle_status TEXT,
            z2data_rohs TEXT,
            z2data_reach TEXT,
            z2data_datasheet_url TEXT,
            z2data_enriched_at TEXT,
            z2data_error TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_bom_line_items_assembly_line \
         ON bom_line_items(assembly_id, line_number)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert default settings without overwriting operator-set values
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind("enrich_database_max_lock_wait_ms")
        .bind(DEFAULT_MAX_LOCK_WAIT_MS.to_string())
        .execute(pool)
        .await?;
    Ok(())
}
