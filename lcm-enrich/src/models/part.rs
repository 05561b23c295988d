//! Parts-source results at the client boundary
//!
//! The raw response envelope never leaves the client module; these are the
//! typed shapes the rest of the crate sees.

use serde::{Deserialize, Serialize};

/// One search hit from the parts source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Opaque id assigned by the source (numeric ids are carried as text)
    pub external_part_id: String,
    pub mpn: String,
    pub manufacturer: String,
    pub description: String,
    pub datasheet_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
}

/// Richer record for one part id (lifecycle and compliance)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDetails {
    pub external_part_id: Option<String>,
    pub mpn: Option<String>,
    pub manufacturer: Option<String>,
    pub description: Option<String>,
    pub datasheet_url: Option<String>,
    pub lifecycle_status: Option<String>,
    pub rohs_status: Option<String>,
    pub reach_status: Option<String>,
}

/// Fields known before the details fetch (search hit or caller-supplied)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackFields {
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "datasheet")]
    pub datasheet_url: Option<String>,
}

impl From<&Candidate> for FallbackFields {
    fn from(candidate: &Candidate) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            manufacturer: non_empty(&candidate.manufacturer),
            description: non_empty(&candidate.description),
            datasheet_url: non_empty(&candidate.datasheet_url),
        }
    }
}

/// Merged record written onto a line item on success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub external_part_id: String,
    pub manufacturer: String,
    pub description: String,
    pub lifecycle_status: String,
    pub rohs_status: String,
    pub reach_status: String,
    pub datasheet_url: String,
}

impl EnrichmentResult {
    /// Each field prefers the details record, then the fallback, then ""
    pub fn merge(
        external_part_id: impl Into<String>,
        fallback: &FallbackFields,
        details: Option<&PartDetails>,
    ) -> Self {
        fn pick(primary: Option<&String>, secondary: Option<&String>) -> String {
            primary.or(secondary).cloned().unwrap_or_default()
        }

        let d = details.cloned().unwrap_or_default();
        Self {
            external_part_id: external_part_id.into(),
            manufacturer: pick(d.manufacturer.as_ref(), fallback.manufacturer.as_ref()),
            description: pick(d.description.as_ref(), fallback.description.as_ref()),
            lifecycle_status: d.lifecycle_status.unwrap_or_default(),
            rohs_status: d.rohs_status.unwrap_or_default(),
            reach_status: d.reach_status.unwrap_or_default(),
            datasheet_url: pick(d.datasheet_url.as_ref(), fallback.datasheet_url.as_ref()),
        }
    }
}
