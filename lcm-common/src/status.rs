//! Assembly enrichment status
//!
//! Stored in `assemblies.enrichment_status` and carried in progress events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Assembly-level enrichment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    /// No batch has run yet
    #[default]
    NotStarted,
    /// A batch run is active
    InProgress,
    /// Run finished with some enrichable items still unresolved
    Partial,
    /// Every enrichable item carries an enrichment timestamp
    Completed,
}

impl EnrichmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentStatus::NotStarted => "not_started",
            EnrichmentStatus::InProgress => "in_progress",
            EnrichmentStatus::Partial => "partial",
            EnrichmentStatus::Completed => "completed",
        }
    }

    /// Terminal status for a finished run: completed iff nothing is left over
    pub fn terminal(enriched_count: usize, enrichable_total: usize) -> Self {
        if enriched_count == enrichable_total {
            EnrichmentStatus::Completed
        } else {
            EnrichmentStatus::Partial
        }
    }
}

impl fmt::Display for EnrichmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrichmentStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(EnrichmentStatus::NotStarted),
            "in_progress" => Ok(EnrichmentStatus::InProgress),
            "partial" => Ok(EnrichmentStatus::Partial),
            "completed" => Ok(EnrichmentStatus::Completed),
            other => Err(crate::Error::CorruptRow(format!(
                "unknown enrichment status '{}'",
                other
            ))),
        }
    }
}
