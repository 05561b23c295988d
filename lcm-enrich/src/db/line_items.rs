//! BOM line item persistence
//!
//! Import writes every column once. Afterwards only the `z2data_*` enrichment
//! columns are updated, by the batch orchestrator and by manual resolution.

use chrono::{DateTime, Utc};
use lcm_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, settings};
use crate::models::{EnrichmentRecord, EnrichmentResult, LineItem, LineItemInput, SupplierRef};
use crate::utils::retry_on_lock;

/// Rows per insert transaction during import
pub const INSERT_CHUNK_SIZE: usize = 500;

const SELECT_COLUMNS: &str = r#"
    SELECT id, assembly_id, line_number, section, value, shorttext, quantity,
           supplier1_name, supplier1_order_number, supplier2_name, supplier2_order_number,
           z2data_part_id, z2data_manufacturer, z2data_description, z2data_lifecycle_status,
           z2data_rohs, z2data_reach, z2data_datasheet_url, z2data_enriched_at, z2data_error,
           created_at
    FROM bom_line_items
"#;

fn row_to_line_item(row: &SqliteRow) -> Result<LineItem> {
    let id: String = row.get("id");
    let assembly_id: String = row.get("assembly_id");
    let quantity: i64 = row.get("quantity");
    let enriched_at: Option<String> = row.get("z2data_enriched_at");
    let created_at: String = row.get("created_at");

    Ok(LineItem {
        id: parse_uuid("bom_line_items.id", &id)?,
        assembly_id: parse_uuid("bom_line_items.assembly_id", &assembly_id)?,
        line_number: row.get("line_number"),
        section: row.get("section"),
        identifier: row.get("value"),
        description: row.get("shorttext"),
        quantity: u32::try_from(quantity)
            .map_err(|_| Error::CorruptRow(format!("quantity out of range: {}", quantity)))?,
        supplier1: SupplierRef::from_parts(
            row.get("supplier1_name"),
            row.get("supplier1_order_number"),
        ),
        supplier2: SupplierRef::from_parts(
            row.get("supplier2_name"),
            row.get("supplier2_order_number"),
        ),
        enrichment: EnrichmentRecord {
            external_part_id: row.get("z2data_part_id"),
            manufacturer: row.get("z2data_manufacturer"),
            description: row.get("z2data_description"),
            lifecycle_status: row.get("z2data_lifecycle_status"),
            rohs_status: row.get("z2data_rohs"),
            reach_status: row.get("z2data_reach"),
            datasheet_url: row.get("z2data_datasheet_url"),
            enriched_at: enriched_at
                .as_deref()
                .map(|s| parse_timestamp("z2data_enriched_at", s))
                .transpose()?,
            error: row.get("z2data_error"),
        },
        created_at: parse_timestamp("bom_line_items.created_at", &created_at)?,
    })
}

fn blank_to_none(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Insert parsed BOM rows for an assembly, one transaction per chunk
///
/// A failing chunk is rolled back and reported by its 1-based index; earlier
/// chunks stay committed (callers remove the assembly to undo them).
pub async fn insert_line_items(
    pool: &SqlitePool,
    assembly_id: Uuid,
    items: &[LineItemInput],
) -> Result<()> {
    let assembly_id = assembly_id.to_string();
    let created_at = Utc::now().to_rfc3339();
    let chunk_count = items.len().div_ceil(INSERT_CHUNK_SIZE);

    for (index, chunk) in items.chunks(INSERT_CHUNK_SIZE).enumerate() {
        insert_chunk(pool, &assembly_id, &created_at, chunk)
            .await
            .map_err(|e| {
                Error::Internal(format!(
                    "Failed to insert line items chunk {} of {}: {}",
                    index + 1,
                    chunk_count,
                    e
                ))
            })?;
    }

    Ok(())
}

async fn insert_chunk(
    pool: &SqlitePool,
    assembly_id: &str,
    created_at: &str,
    chunk: &[LineItemInput],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    for item in chunk {
        sqlx::query(
            r#"
            INSERT INTO bom_line_items (
                id, assembly_id, line_number, section, value, shorttext, quantity,
                supplier1_name, supplier1_order_number, supplier2_name, supplier2_order_number,
                created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(assembly_id)
        .bind(item.line_number)
        .bind(item.section.trim())
        .bind(item.value.trim())
        .bind(item.shorttext.trim())
        .bind(i64::from(item.quantity))
        .bind(blank_to_none(&item.supplier1_name))
        .bind(blank_to_none(&item.supplier1_order_number))
        .bind(blank_to_none(&item.supplier2_name))
        .bind(blank_to_none(&item.supplier2_order_number))
        .bind(created_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Up to `limit` items never attempted, in line order
///
/// Unprocessed: non-blank identifier, no enrichment timestamp, no error.
pub async fn list_unprocessed(
    pool: &SqlitePool,
    assembly_id: Uuid,
    limit: usize,
) -> Result<Vec<LineItem>> {
    let rows = sqlx::query(&format!(
        "{} WHERE assembly_id = ? AND TRIM(value) <> '' \
         AND z2data_enriched_at IS NULL AND z2data_error IS NULL \
         ORDER BY line_number LIMIT ?",
        SELECT_COLUMNS
    ))
    .bind(assembly_id.to_string())
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_line_item).collect()
}

/// Every item of an assembly, in line order
pub async fn list_all(pool: &SqlitePool, assembly_id: Uuid) -> Result<Vec<LineItem>> {
    let rows = sqlx::query(&format!(
        "{} WHERE assembly_id = ? ORDER BY line_number",
        SELECT_COLUMNS
    ))
    .bind(assembly_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_line_item).collect()
}

/// Items whose last automatic attempt failed and that are not yet resolved
pub async fn list_failed(pool: &SqlitePool, assembly_id: Uuid) -> Result<Vec<LineItem>> {
    let rows = sqlx::query(&format!(
        "{} WHERE assembly_id = ? AND z2data_error IS NOT NULL \
         AND z2data_enriched_at IS NULL ORDER BY line_number",
        SELECT_COLUMNS
    ))
    .bind(assembly_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_line_item).collect()
}

/// One item, scoped to its assembly
pub async fn get_item(
    pool: &SqlitePool,
    assembly_id: Uuid,
    item_id: Uuid,
) -> Result<Option<LineItem>> {
    let row = sqlx::query(&format!("{} WHERE assembly_id = ? AND id = ?", SELECT_COLUMNS))
        .bind(assembly_id.to_string())
        .bind(item_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_line_item).transpose()
}

/// Write a successful enrichment: all fields, timestamp, and clear the error
pub async fn mark_enriched(
    pool: &SqlitePool,
    item_id: Uuid,
    result: &EnrichmentResult,
    enriched_at: DateTime<Utc>,
) -> Result<()> {
    let max_wait_ms = settings::get_max_lock_wait_ms(pool).await?;
    let item_id_str = item_id.to_string();
    let enriched_at = enriched_at.to_rfc3339();

    let affected = retry_on_lock("mark_enriched", max_wait_ms, || async {
        let outcome = sqlx::query(
            r#"
            UPDATE bom_line_items SET
                z2data_part_id = ?,
                z2data_manufacturer = ?,
                z2data_description = ?,
                z2data_lifecycle_status = ?,
                z2data_rohs = ?,
                z2data_reach = ?,
                z2data_datasheet_url = ?,
                z2data_enriched_at = ?,
                z2data_error = NULL
            WHERE id = ?
            "#,
        )
        .bind(&result.external_part_id)
        .bind(&result.manufacturer)
        .bind(&result.description)
        .bind(&result.lifecycle_status)
        .bind(&result.rohs_status)
        .bind(&result.reach_status)
        .bind(&result.datasheet_url)
        .bind(&enriched_at)
        .bind(&item_id_str)
        .execute(pool)
        .await
        .map_err(Error::Database)?;
        Ok::<u64, Error>(outcome.rows_affected())
    })
    .await?;

    if affected == 0 {
        return Err(Error::NotFound(format!("Line item {}", item_id)));
    }
    Ok(())
}

/// Record a per-item failure; other enrichment columns are left untouched
pub async fn mark_failed(pool: &SqlitePool, item_id: Uuid, error: &str) -> Result<()> {
    let max_wait_ms = settings::get_max_lock_wait_ms(pool).await?;
    let item_id_str = item_id.to_string();

    let affected = retry_on_lock("mark_failed", max_wait_ms, || async {
        let outcome = sqlx::query("UPDATE bom_line_items SET z2data_error = ? WHERE id = ?")
            .bind(error)
            .bind(&item_id_str)
            .execute(pool)
            .await
            .map_err(Error::Database)?;
        Ok::<u64, Error>(outcome.rows_affected())
    })
    .await?;

    if affected == 0 {
        return Err(Error::NotFound(format!("Line item {}", item_id)));
    }
    Ok(())
}
