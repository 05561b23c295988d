//! BOM line items
//!
//! A line item is created in bulk when a BOM is imported. Its identifier,
//! description and quantity never change afterwards; the enrichment subsystem
//! only annotates it through [`EnrichmentRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supplier reference (name + order number) from the BOM spreadsheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierRef {
    pub name: Option<String>,
    pub order_number: Option<String>,
}

impl SupplierRef {
    /// Build from the two nullable columns; `None` when both are blank
    pub fn from_parts(name: Option<String>, order_number: Option<String>) -> Option<Self> {
        let name = name.filter(|s| !s.trim().is_empty());
        let order_number = order_number.filter(|s| !s.trim().is_empty());
        if name.is_none() && order_number.is_none() {
            None
        } else {
            Some(Self { name, order_number })
        }
    }
}

/// Enrichment fields held on a line item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub external_part_id: Option<String>,
    pub manufacturer: Option<String>,
    pub description: Option<String>,
    pub lifecycle_status: Option<String>,
    pub rohs_status: Option<String>,
    pub reach_status: Option<String>,
    pub datasheet_url: Option<String>,
    /// Set iff automatic or manual enrichment succeeded
    pub enriched_at: Option<DateTime<Utc>>,
    /// Set iff the last automatic attempt failed
    pub error: Option<String>,
}

/// One row of a parsed BOM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub assembly_id: Uuid,
    pub line_number: i64,
    pub section: String,
    /// Raw component value (usually an MPN), trimmed, possibly empty
    #[serde(rename = "value")]
    pub identifier: String,
    /// Free-text short description
    #[serde(rename = "shorttext")]
    pub description: String,
    pub quantity: u32,
    pub supplier1: Option<SupplierRef>,
    pub supplier2: Option<SupplierRef>,
    pub enrichment: EnrichmentRecord,
    pub created_at: DateTime<Utc>,
}

impl LineItem {
    /// Items with a blank identifier are never enriched nor counted
    pub fn is_enrichable(&self) -> bool {
        !self.identifier.trim().is_empty()
    }

    pub fn is_enriched(&self) -> bool {
        self.enrichment.enriched_at.is_some()
    }

    pub fn has_error(&self) -> bool {
        self.enrichment.error.is_some()
    }

    /// Enrichable, not enriched, and not already failed
    pub fn is_unprocessed(&self) -> bool {
        self.is_enrichable() && !self.is_enriched() && !self.has_error()
    }

    /// Description to hand to the resolver; `None` when blank
    pub fn description_hint(&self) -> Option<&str> {
        let trimmed = self.description.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Line item as produced by the spreadsheet parser
///
/// Field names follow the parser's flat column layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemInput {
    pub line_number: i64,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub shorttext: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub supplier1_name: Option<String>,
    #[serde(default)]
    pub supplier1_order_number: Option<String>,
    #[serde(default)]
    pub supplier2_name: Option<String>,
    #[serde(default)]
    pub supplier2_order_number: Option<String>,
}
