//! Single-item enrichment
//!
//! Resolves one identifier to a part record:
//! 1. Exact search; first hit wins
//! 2. Otherwise the stripped identifier; exactly one hit is accepted
//! 3. Details fetch for the accepted id, degrading to search-hit fields
//!
//! No retries here. Zero or ambiguous matches are per-item failures that the
//! manual resolution workflow picks up later.

use std::sync::Arc;
use thiserror::Error;

use crate::models::{Candidate, EnrichmentResult, FallbackFields};
use crate::services::mpn_variants::strip_separators;
use crate::services::z2data_client::{PartsSource, SourceError};

/// Enrichment errors
#[derive(Debug, Clone, Error)]
pub enum EnrichError {
    #[error("No Z2Data results for MPN: {0}")]
    NoResults(String),

    #[error("Multiple Z2Data matches for MPN: {identifier} ({count} results), resolve manually")]
    MultipleMatches { identifier: String, count: usize },

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl EnrichError {
    /// Errors that must abort the surrounding batch instead of being recorded
    pub fn is_fatal(&self) -> bool {
        match self {
            EnrichError::Source(e) => e.is_fatal(),
            _ => false,
        }
    }
}

/// Chains search and details lookups for one identifier
#[derive(Clone)]
pub struct EnrichmentEngine {
    source: Arc<dyn PartsSource>,
}

impl EnrichmentEngine {
    pub fn new(source: Arc<dyn PartsSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn PartsSource> {
        &self.source
    }

    /// Enrich one identifier
    ///
    /// `_description` is accepted for symmetry with candidate search; automatic
    /// enrichment never searches by free text.
    pub async fn enrich_one(
        &self,
        identifier: &str,
        _description: Option<&str>,
    ) -> Result<EnrichmentResult, EnrichError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(EnrichError::NoResults(String::new()));
        }
        let hit = self.find_match(identifier).await?;
        Ok(self.complete(hit).await)
    }

    async fn find_match(&self, identifier: &str) -> Result<Candidate, EnrichError> {
        let exact = self.source.search(identifier).await?;
        if let Some(hit) = exact.into_iter().next() {
            return Ok(hit);
        }

        let stripped = strip_separators(identifier);
        if stripped.is_empty() || stripped == identifier {
            return Err(EnrichError::NoResults(identifier.to_string()));
        }

        tracing::debug!(
            identifier = %identifier,
            stripped = %stripped,
            "Exact search empty, trying stripped identifier"
        );

        let mut hits = self.source.search(&stripped).await?;
        match hits.len() {
            0 => Err(EnrichError::NoResults(identifier.to_string())),
            1 => Ok(hits.remove(0)),
            count => Err(EnrichError::MultipleMatches {
                identifier: identifier.to_string(),
                count,
            }),
        }
    }

    async fn complete(&self, hit: Candidate) -> EnrichmentResult {
        let fallback = FallbackFields::from(&hit);
        resolve_details(self.source.as_ref(), &hit.external_part_id, &fallback).await
    }
}

/// Fetch details for a chosen part id and merge with caller-supplied fields
///
/// Used by manual resolution; a details failure degrades to `fallback`.
pub async fn resolve_details(
    source: &dyn PartsSource,
    external_part_id: &str,
    fallback: &FallbackFields,
) -> EnrichmentResult {
    let details = match source.get_details(external_part_id).await {
        Ok(details) => details,
        Err(e) => {
            tracing::warn!(
                part_id = %external_part_id,
                error = %e,
                "Details fetch failed, using supplied fields"
            );
            None
        }
    };

    EnrichmentResult::merge(external_part_id, fallback, details.as_ref())
}
