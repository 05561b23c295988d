//! Assembly persistence
//!
//! Enrichment aggregates live on the assembly row and are always written from
//! a full recompute (last writer wins).

use chrono::Utc;
use lcm_common::{EnrichmentStatus, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{line_items, parse_count, parse_timestamp, parse_uuid, settings};
use crate::models::{Assembly, EnrichmentSummary, LineItemInput};
use crate::utils::retry_on_lock;

const SELECT_COLUMNS: &str = "SELECT id, name, customer, status, line_item_count, total_quantity, \
     enrichment_status, enriched_count, enrichable_total, created_at FROM assemblies";

fn row_to_assembly(row: &SqliteRow) -> Result<Assembly> {
    let id: String = row.get("id");
    let enrichment_status: String = row.get("enrichment_status");
    let created_at: String = row.get("created_at");
    let total_quantity: i64 = row.get("total_quantity");

    Ok(Assembly {
        id: parse_uuid("assemblies.id", &id)?,
        name: row.get("name"),
        customer: row.get("customer"),
        status: row.get("status"),
        line_item_count: parse_count("line_item_count", row.get("line_item_count"))?,
        total_quantity: u64::try_from(total_quantity).map_err(|_| {
            Error::CorruptRow(format!("total_quantity is negative: {}", total_quantity))
        })?,
        enrichment_status: enrichment_status.parse()?,
        enriched_count: parse_count("enriched_count", row.get("enriched_count"))?,
        enrichable_total: parse_count("enrichable_total", row.get("enrichable_total"))?,
        created_at: parse_timestamp("assemblies.created_at", &created_at)?,
    })
}

pub async fn insert_assembly(pool: &SqlitePool, assembly: &Assembly) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO assemblies (
            id, name, customer, status, line_item_count, total_quantity,
            enrichment_status, enriched_count, enrichable_total, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(assembly.id.to_string())
    .bind(&assembly.name)
    .bind(&assembly.customer)
    .bind(&assembly.status)
    .bind(assembly.line_item_count as i64)
    .bind(assembly.total_quantity as i64)
    .bind(assembly.enrichment_status.as_str())
    .bind(assembly.enriched_count as i64)
    .bind(assembly.enrichable_total as i64)
    .bind(assembly.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Create an assembly and its line items
///
/// Items are inserted in chunks; if any chunk fails the assembly is deleted
/// (cascading to the items already written) and the failing chunk is named in
/// the error.
pub async fn import_assembly(
    pool: &SqlitePool,
    name: &str,
    customer: &str,
    items: &[LineItemInput],
) -> Result<Assembly> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Assembly name is required".to_string()));
    }
    if items.is_empty() {
        return Err(Error::InvalidInput("No line items to import".to_string()));
    }

    let assembly = Assembly {
        id: Uuid::new_v4(),
        name: name.to_string(),
        customer: customer.trim().to_string(),
        status: "Draft".to_string(),
        line_item_count: items.len(),
        total_quantity: items.iter().map(|i| u64::from(i.quantity)).sum(),
        enrichment_status: EnrichmentStatus::NotStarted,
        enriched_count: 0,
        enrichable_total: 0,
        created_at: Utc::now(),
    };

    insert_assembly(pool, &assembly).await?;

    if let Err(e) = line_items::insert_line_items(pool, assembly.id, items).await {
        tracing::error!(
            assembly_id = %assembly.id,
            error = %e,
            "Line item import failed, removing assembly"
        );
        if let Err(cleanup) = delete_assembly(pool, assembly.id).await {
            tracing::error!(assembly_id = %assembly.id, error = %cleanup, "Cleanup failed");
        }
        return Err(e);
    }

    tracing::info!(
        assembly_id = %assembly.id,
        line_items = assembly.line_item_count,
        total_quantity = assembly.total_quantity,
        "Imported assembly"
    );

    Ok(assembly)
}

/// All assemblies, newest first
pub async fn list_assemblies(pool: &SqlitePool) -> Result<Vec<Assembly>> {
    let rows = sqlx::query(&format!("{} ORDER BY created_at DESC", SELECT_COLUMNS))
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_assembly).collect()
}

pub async fn get_assembly(pool: &SqlitePool, id: Uuid) -> Result<Option<Assembly>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_assembly).transpose()
}

/// Like [`get_assembly`] but missing rows are [`Error::NotFound`]
pub async fn require_assembly(pool: &SqlitePool, id: Uuid) -> Result<Assembly> {
    get_assembly(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Assembly {}", id)))
}

/// Delete an assembly (line items cascade); false if it did not exist
pub async fn delete_assembly(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM assemblies WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn ensure_found(rows_affected: u64, id: Uuid) -> Result<()> {
    if rows_affected == 0 {
        return Err(Error::NotFound(format!("Assembly {}", id)));
    }
    Ok(())
}

/// Persist counts only (mid-run)
pub async fn update_enrichment_counts(
    pool: &SqlitePool,
    id: Uuid,
    enriched_count: usize,
    enrichable_total: usize,
) -> Result<()> {
    let max_wait_ms = settings::get_max_lock_wait_ms(pool).await?;
    let id_str = id.to_string();

    let affected = retry_on_lock("update_enrichment_counts", max_wait_ms, || async {
        let result = sqlx::query(
            "UPDATE assemblies SET enriched_count = ?, enrichable_total = ? WHERE id = ?",
        )
        .bind(enriched_count as i64)
        .bind(enrichable_total as i64)
        .bind(&id_str)
        .execute(pool)
        .await
        .map_err(Error::Database)?;
        Ok::<u64, Error>(result.rows_affected())
    })
    .await?;

    ensure_found(affected, id)
}

pub async fn set_enrichment_status(
    pool: &SqlitePool,
    id: Uuid,
    status: EnrichmentStatus,
) -> Result<()> {
    let max_wait_ms = settings::get_max_lock_wait_ms(pool).await?;
    let id_str = id.to_string();

    let affected = retry_on_lock("set_enrichment_status", max_wait_ms, || async {
        let result = sqlx::query("UPDATE assemblies SET enrichment_status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(&id_str)
            .execute(pool)
            .await
            .map_err(Error::Database)?;
        Ok::<u64, Error>(result.rows_affected())
    })
    .await?;

    ensure_found(affected, id)
}

/// Persist counts and the status they imply
pub async fn update_summary(pool: &SqlitePool, id: Uuid, summary: &EnrichmentSummary) -> Result<()> {
    let max_wait_ms = settings::get_max_lock_wait_ms(pool).await?;
    let id_str = id.to_string();

    let affected = retry_on_lock("update_summary", max_wait_ms, || async {
        let result = sqlx::query(
            "UPDATE assemblies SET enriched_count = ?, enrichable_total = ?, \
             enrichment_status = ? WHERE id = ?",
        )
        .bind(summary.enriched_count as i64)
        .bind(summary.enrichable_total as i64)
        .bind(summary.status.as_str())
        .bind(&id_str)
        .execute(pool)
        .await
        .map_err(Error::Database)?;
        Ok::<u64, Error>(result.rows_affected())
    })
    .await?;

    ensure_found(affected, id)
}
