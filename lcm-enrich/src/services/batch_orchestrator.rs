//! Batch orchestrator and progress tracker
//!
//! Enriches an assembly in bounded batches. Each call to
//! [`BatchOrchestrator::run_batch`] takes the next `BATCH_SIZE` unprocessed
//! items in line order and processes them one at a time. Per-item failures are
//! recorded on the item; only a fatal source error (authentication,
//! configuration) aborts the batch.
//!
//! Progress is never tracked in memory: counts are recomputed from the stored
//! line items after every batch, so a crashed or cancelled run resumes by
//! simply calling `run_batch` again.

use chrono::Utc;
use lcm_common::events::{EventBus, LcmEvent};
use lcm_common::EnrichmentStatus;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::{assemblies, line_items};
use crate::models::{summarize, EnrichmentSummary};
use crate::services::enrichment_engine::{EnrichError, EnrichmentEngine};
use crate::services::z2data_client::SourceError;

/// Items processed per batch
pub const BATCH_SIZE: usize = 10;

/// Errors that cross the batch boundary
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Fatal source condition; the run cannot continue
    #[error(transparent)]
    Source(SourceError),

    #[error(transparent)]
    Store(#[from] lcm_common::Error),
}

/// Whether more batches remain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    InProgress,
    Done,
}

/// Result of one `run_batch` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub status: BatchStatus,
    pub enriched_in_batch: usize,
    pub errors_in_batch: usize,
    pub enriched_total: usize,
    pub enrichable_total: usize,
}

impl BatchOutcome {
    fn done(summary: &EnrichmentSummary) -> Self {
        Self {
            status: BatchStatus::Done,
            enriched_in_batch: 0,
            errors_in_batch: 0,
            enriched_total: summary.enriched_count,
            enrichable_total: summary.enrichable_total,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == BatchStatus::Done
    }
}

/// How a full run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed {
        status: EnrichmentStatus,
        enriched_total: usize,
        enrichable_total: usize,
    },
    Cancelled {
        batches: usize,
    },
}

/// Drives the enrichment engine over an assembly's line items
#[derive(Clone)]
pub struct BatchOrchestrator {
    db: SqlitePool,
    engine: EnrichmentEngine,
    event_bus: EventBus,
    batch_size: usize,
}

impl BatchOrchestrator {
    pub fn new(db: SqlitePool, engine: EnrichmentEngine, event_bus: EventBus) -> Self {
        Self {
            db,
            engine,
            event_bus,
            batch_size: BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Full scan of the assembly's items
    async fn recompute(&self, assembly_id: Uuid) -> Result<EnrichmentSummary, OrchestratorError> {
        let items = line_items::list_all(&self.db, assembly_id).await?;
        Ok(summarize(&items))
    }

    /// Process the next batch of unprocessed items
    pub async fn run_batch(&self, assembly_id: Uuid) -> Result<BatchOutcome, OrchestratorError> {
        assemblies::require_assembly(&self.db, assembly_id).await?;

        let batch = line_items::list_unprocessed(&self.db, assembly_id, self.batch_size).await?;

        if batch.is_empty() {
            let summary = self.recompute(assembly_id).await?;
            assemblies::update_summary(&self.db, assembly_id, &summary).await?;
            tracing::info!(
                assembly_id = %assembly_id,
                enriched = summary.enriched_count,
                enrichable = summary.enrichable_total,
                status = %summary.status,
                "Enrichment finished"
            );
            return Ok(BatchOutcome::done(&summary));
        }

        assemblies::set_enrichment_status(&self.db, assembly_id, EnrichmentStatus::InProgress)
            .await?;

        let mut enriched_in_batch = 0;
        let mut errors_in_batch = 0;

        for item in &batch {
            match self
                .engine
                .enrich_one(&item.identifier, item.description_hint())
                .await
            {
                Ok(result) => {
                    line_items::mark_enriched(&self.db, item.id, &result, Utc::now()).await?;
                    enriched_in_batch += 1;
                    tracing::debug!(
                        assembly_id = %assembly_id,
                        item_id = %item.id,
                        identifier = %item.identifier,
                        part_id = %result.external_part_id,
                        "Line item enriched"
                    );
                }
                Err(EnrichError::Source(e)) if e.is_fatal() => {
                    tracing::error!(
                        assembly_id = %assembly_id,
                        item_id = %item.id,
                        error = %e,
                        "Fatal source error, aborting batch"
                    );
                    let summary = self.recompute(assembly_id).await?;
                    assemblies::update_summary(&self.db, assembly_id, &summary).await?;
                    return Err(OrchestratorError::Source(e));
                }
                Err(e) => {
                    line_items::mark_failed(&self.db, item.id, &e.to_string()).await?;
                    errors_in_batch += 1;
                    tracing::warn!(
                        assembly_id = %assembly_id,
                        item_id = %item.id,
                        identifier = %item.identifier,
                        error = %e,
                        "Line item enrichment failed"
                    );
                }
            }
        }

        let summary = self.recompute(assembly_id).await?;
        assemblies::update_enrichment_counts(
            &self.db,
            assembly_id,
            summary.enriched_count,
            summary.enrichable_total,
        )
        .await?;

        tracing::info!(
            assembly_id = %assembly_id,
            enriched_in_batch,
            errors_in_batch,
            enriched_total = summary.enriched_count,
            enrichable_total = summary.enrichable_total,
            "Enrichment batch complete"
        );

        Ok(BatchOutcome {
            status: BatchStatus::InProgress,
            enriched_in_batch,
            errors_in_batch,
            enriched_total: summary.enriched_count,
            enrichable_total: summary.enrichable_total,
        })
    }

    /// Call `run_batch` until done, checking `cancel` between batches
    ///
    /// An in-flight batch always finishes. On cancellation the counts and the
    /// status they imply are persisted so the assembly does not stay
    /// `in_progress`.
    pub async fn run_to_completion(
        &self,
        assembly_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, OrchestratorError> {
        self.event_bus.emit_lossy(LcmEvent::EnrichmentRunStarted {
            assembly_id,
            timestamp: Utc::now(),
        });

        let mut batches = 0usize;
        loop {
            if cancel.is_cancelled() {
                return self.finish_cancelled(assembly_id, batches).await;
            }

            let outcome = match self.run_batch(assembly_id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.event_bus.emit_lossy(LcmEvent::EnrichmentRunFailed {
                        assembly_id,
                        error: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    return Err(e);
                }
            };

            if outcome.is_done() {
                let status =
                    EnrichmentStatus::terminal(outcome.enriched_total, outcome.enrichable_total);
                self.event_bus.emit_lossy(LcmEvent::EnrichmentRunCompleted {
                    assembly_id,
                    status,
                    enriched_total: outcome.enriched_total,
                    enrichable_total: outcome.enrichable_total,
                    timestamp: Utc::now(),
                });
                return Ok(RunOutcome::Completed {
                    status,
                    enriched_total: outcome.enriched_total,
                    enrichable_total: outcome.enrichable_total,
                });
            }

            batches += 1;
            self.event_bus.emit_lossy(LcmEvent::EnrichmentBatchCompleted {
                assembly_id,
                enriched_in_batch: outcome.enriched_in_batch,
                errors_in_batch: outcome.errors_in_batch,
                enriched_total: outcome.enriched_total,
                enrichable_total: outcome.enrichable_total,
                timestamp: Utc::now(),
            });
        }
    }

    async fn finish_cancelled(
        &self,
        assembly_id: Uuid,
        batches: usize,
    ) -> Result<RunOutcome, OrchestratorError> {
        let summary = self.recompute(assembly_id).await?;
        assemblies::update_summary(&self.db, assembly_id, &summary).await?;

        tracing::info!(assembly_id = %assembly_id, batches, "Enrichment run cancelled");
        self.event_bus.emit_lossy(LcmEvent::EnrichmentRunCancelled {
            assembly_id,
            timestamp: Utc::now(),
        });
        Ok(RunOutcome::Cancelled { batches })
    }
}
