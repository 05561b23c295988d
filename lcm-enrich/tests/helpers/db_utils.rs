//! Database Test Utilities

use lcm_enrich::db::{assemblies, line_items};
use lcm_enrich::models::{LineItem, LineItemInput};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

/// In-memory database with the full schema
///
/// One connection only: every `sqlite::memory:` connection is its own database.
pub async fn create_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    lcm_common::db::init_schema(&pool)
        .await
        .expect("Failed to initialize schema");
    pool
}

/// Import an assembly whose rows are `(value, shorttext)` pairs, numbered from 1
pub async fn seed_assembly(pool: &SqlitePool, rows: &[(&str, &str)]) -> Uuid {
    let items: Vec<LineItemInput> = rows
        .iter()
        .enumerate()
        .map(|(i, (value, shorttext))| LineItemInput {
            line_number: i as i64 + 1,
            section: "Main".to_string(),
            value: value.to_string(),
            shorttext: shorttext.to_string(),
            quantity: 1,
            supplier1_name: None,
            supplier1_order_number: None,
            supplier2_name: None,
            supplier2_order_number: None,
        })
        .collect();

    assemblies::import_assembly(pool, "Test board", "ACME", &items)
        .await
        .expect("Failed to seed assembly")
        .id
}

pub async fn item_by_value(pool: &SqlitePool, assembly_id: Uuid, value: &str) -> LineItem {
    line_items::list_all(pool, assembly_id)
        .await
        .unwrap()
        .into_iter()
        .find(|item| item.identifier == value)
        .unwrap_or_else(|| panic!("no line item with value {}", value))
}

/// True if no enrichment data (other than `error`) has been written
pub fn enrichment_columns_blank(item: &LineItem) -> bool {
    let e = &item.enrichment;
    e.external_part_id.is_none()
        && e.manufacturer.is_none()
        && e.description.is_none()
        && e.lifecycle_status.is_none()
        && e.rohs_status.is_none()
        && e.reach_status.is_none()
        && e.datasheet_url.is_none()
        && e.enriched_at.is_none()
}
