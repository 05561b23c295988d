//! Candidate search for manual resolution
//!
//! Widens the search for an identifier that failed automatic enrichment:
//! exact identifier, then every normalizer variant, then the free-text
//! description. Results are deduplicated by external part id and capped.

use std::collections::HashSet;

use crate::models::Candidate;
use crate::services::mpn_variants::generate_variants;
use crate::services::z2data_client::{PartsSource, SourceError};

/// Upper bound on candidates offered to the user
pub const MAX_CANDIDATES: usize = 20;

/// Ordered, deduplicating accumulator
struct CandidateSet {
    seen: HashSet<String>,
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
            candidates: Vec::new(),
        }
    }

    fn extend(&mut self, hits: Vec<Candidate>) {
        for hit in hits {
            if self.seen.insert(hit.external_part_id.clone()) {
                self.candidates.push(hit);
            }
        }
    }

    fn is_full(&self) -> bool {
        self.candidates.len() >= MAX_CANDIDATES
    }

    fn into_capped(mut self) -> Vec<Candidate> {
        self.candidates.truncate(MAX_CANDIDATES);
        self.candidates
    }
}

/// Collect up to [`MAX_CANDIDATES`] distinct candidates in discovery order
///
/// An empty result is a normal outcome, and a blank identifier is never
/// searched (not even by description). Source errors (including
/// authentication) are returned to the caller unchanged.
pub async fn find_candidates(
    source: &dyn PartsSource,
    identifier: &str,
    description: Option<&str>,
) -> Result<Vec<Candidate>, SourceError> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Ok(Vec::new());
    }

    let mut set = CandidateSet::new();
    set.extend(source.search(identifier).await?);

    if !set.is_full() {
        for variant in generate_variants(identifier) {
            set.extend(source.search(&variant).await?);
            if set.is_full() {
                break;
            }
        }
    }

    if !set.is_full() {
        if let Some(text) = description.map(str::trim).filter(|s| !s.is_empty()) {
            set.extend(source.search(text).await?);
        }
    }

    let candidates = set.into_capped();
    tracing::debug!(
        identifier = %identifier,
        candidates = candidates.len(),
        "Candidate search complete"
    );
    Ok(candidates)
}
