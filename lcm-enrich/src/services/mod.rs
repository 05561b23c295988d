//! Enrichment services
//!
//! - `mpn_variants`: identifier normalization for fuzzy search
//! - `z2data_client`: parts-search source trait and its Z2Data implementation
//! - `candidate_resolver`: widened candidate search for manual resolution
//! - `enrichment_engine`: single-item search + details chain
//! - `batch_orchestrator`: bounded batches over an assembly, progress tracking
//! - `manual_resolution`: per-assembly resolution workflow

pub mod batch_orchestrator;
pub mod candidate_resolver;
pub mod enrichment_engine;
pub mod manual_resolution;
pub mod mpn_variants;
pub mod z2data_client;

pub use batch_orchestrator::{
    BatchOrchestrator, BatchOutcome, BatchStatus, OrchestratorError, RunOutcome, BATCH_SIZE,
};
pub use candidate_resolver::{find_candidates, MAX_CANDIDATES};
pub use enrichment_engine::{EnrichError, EnrichmentEngine};
pub use manual_resolution::{
    ManualResolver, ResolutionError, ResolutionSession, ResolutionState, SessionError,
};
pub use mpn_variants::{generate_variants, strip_separators};
pub use z2data_client::{PartsSource, SourceError, Z2DataClient, Z2DataConfig};
