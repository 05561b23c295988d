//! Enrichment triggers
//!
//! `POST /assemblies/{id}/enrich` runs exactly one batch and reports whether
//! more remain; a client may poll it until `done`. `.../enrich/run` drives the
//! same batches in a background task instead.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lcm_common::EnrichmentStatus;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::assemblies;
use crate::services::{BatchOutcome, RunOutcome};
use crate::{ApiError, ApiResult, AppState};

/// GET /assemblies/{id}/enrichment response
#[derive(Debug, Serialize)]
pub struct EnrichmentSummaryResponse {
    pub assembly_id: Uuid,
    pub enrichment_status: EnrichmentStatus,
    pub enriched_count: usize,
    pub enrichable_total: usize,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct RunStartedResponse {
    pub assembly_id: Uuid,
    pub status: String,
}

fn run_active(id: Uuid) -> ApiError {
    ApiError::Conflict(format!("Enrichment run already active for assembly {}", id))
}

/// POST /assemblies/{id}/enrich
pub async fn enrich_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BatchOutcome>> {
    let orchestrator = state.orchestrator()?;
    if state.is_run_active(id).await {
        return Err(run_active(id));
    }

    let outcome = orchestrator.run_batch(id).await.map_err(|e| {
        tracing::error!(assembly_id = %id, error = %e, "Enrichment batch failed");
        ApiError::from(e)
    })?;

    Ok(Json(outcome))
}

/// POST /assemblies/{id}/enrich/run
pub async fn start_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<RunStartedResponse>)> {
    let orchestrator = state.orchestrator()?;
    assemblies::require_assembly(&state.db, id).await?;

    let token = CancellationToken::new();
    {
        let mut tokens = state.cancellation_tokens.write().await;
        if tokens.contains_key(&id) {
            return Err(run_active(id));
        }
        tokens.insert(id, token.clone());
    }

    tracing::info!(assembly_id = %id, "Starting background enrichment run");

    let task_state = state.clone();
    let run = tokio::spawn(async move { orchestrator.run_to_completion(id, token).await });
    tokio::spawn(async move {
        // the token is released however the run ends, including a panic
        match run.await {
            Ok(Ok(RunOutcome::Completed {
                status,
                enriched_total,
                enrichable_total,
            })) => {
                tracing::info!(
                    assembly_id = %id,
                    status = %status,
                    enriched_total,
                    enrichable_total,
                    "Enrichment run completed"
                );
            }
            Ok(Ok(RunOutcome::Cancelled { batches })) => {
                tracing::info!(assembly_id = %id, batches, "Enrichment run stopped");
            }
            Ok(Err(e)) => {
                tracing::error!(assembly_id = %id, error = %e, "Enrichment run failed");
                *task_state.last_error.write().await = Some(e.to_string());
            }
            Err(join_error) => {
                tracing::error!(assembly_id = %id, error = %join_error, "Enrichment run task aborted");
                *task_state.last_error.write().await =
                    Some(format!("Enrichment run for assembly {} aborted: {}", id, join_error));
            }
        }

        task_state.cancellation_tokens.write().await.remove(&id);
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(RunStartedResponse {
            assembly_id: id,
            status: "started".to_string(),
        }),
    ))
}

/// POST /assemblies/{id}/enrich/cancel
pub async fn cancel_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let tokens = state.cancellation_tokens.read().await;
    let token = tokens
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("No active enrichment run for assembly {}", id)))?;

    token.cancel();
    tracing::info!(assembly_id = %id, "Enrichment run cancellation requested");
    Ok(StatusCode::ACCEPTED)
}

/// GET /assemblies/{id}/enrichment
pub async fn enrichment_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EnrichmentSummaryResponse>> {
    let assembly = assemblies::require_assembly(&state.db, id).await?;
    let active = state.is_run_active(id).await;

    Ok(Json(EnrichmentSummaryResponse {
        assembly_id: id,
        enrichment_status: assembly.enrichment_status,
        enriched_count: assembly.enriched_count,
        enrichable_total: assembly.enrichable_total,
        active,
    }))
}

pub fn enrichment_routes() -> Router<AppState> {
    Router::new()
        .route("/assemblies/:id/enrich", post(enrich_batch))
        .route("/assemblies/:id/enrich/run", post(start_run))
        .route("/assemblies/:id/enrich/cancel", post(cancel_run))
        .route("/assemblies/:id/enrichment", get(enrichment_summary))
}
