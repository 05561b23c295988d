//! Assemblies and the derived enrichment summary

use chrono::{DateTime, Utc};
use lcm_common::EnrichmentStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LineItem;

/// A BOM imported as one assembly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assembly {
    pub id: Uuid,
    pub name: String,
    pub customer: String,
    /// Workflow status of the assembly itself ("Draft" on import)
    pub status: String,
    pub line_item_count: usize,
    pub total_quantity: u64,
    pub enrichment_status: EnrichmentStatus,
    pub enriched_count: usize,
    pub enrichable_total: usize,
    pub created_at: DateTime<Utc>,
}

/// Aggregate enrichment counts for one assembly
///
/// `status` is the terminal status the counts imply; callers that are still
/// mid-run persist only the counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentSummary {
    pub enrichable_total: usize,
    pub enriched_count: usize,
    pub status: EnrichmentStatus,
}

/// Recompute the summary from a full scan of an assembly's line items
pub fn summarize(items: &[LineItem]) -> EnrichmentSummary {
    let enrichable_total = items.iter().filter(|i| i.is_enrichable()).count();
    let enriched_count = items.iter().filter(|i| i.is_enriched()).count();

    EnrichmentSummary {
        enrichable_total,
        enriched_count,
        status: EnrichmentStatus::terminal(enriched_count, enrichable_total),
    }
}
