//! Manual resolution endpoints

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{assemblies, line_items};
use crate::models::{Candidate, FallbackFields, LineItem};
use crate::{ApiError, ApiResult, AppState};

/// Part ids come from search results and may be sent back as numbers
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PartIdInput {
    Number(i64),
    Text(String),
}

impl PartIdInput {
    fn into_string(self) -> String {
        match self {
            PartIdInput::Number(n) => n.to_string(),
            PartIdInput::Text(s) => s.trim().to_string(),
        }
    }
}

/// POST .../resolve request
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub part_id: Option<PartIdInput>,
    #[serde(flatten)]
    pub fallback: FallbackFields,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub success: bool,
    pub enriched_count: usize,
    pub enrichable_total: usize,
}

#[derive(Debug, Serialize)]
pub struct CandidatesResponse {
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Serialize)]
pub struct FailedItemsResponse {
    pub items: Vec<LineItem>,
}

/// GET /assemblies/{id}/items/failed
pub async fn list_failed_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FailedItemsResponse>> {
    assemblies::require_assembly(&state.db, id).await?;
    let items = line_items::list_failed(&state.db, id).await?;
    Ok(Json(FailedItemsResponse { items }))
}

/// GET /assemblies/{id}/items/{item_id}/candidates
pub async fn get_candidates(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<CandidatesResponse>> {
    let resolver = state.resolver()?;
    let candidates = resolver.candidates_for(id, item_id).await?;
    Ok(Json(CandidatesResponse { candidates }))
}

/// POST /assemblies/{id}/items/{item_id}/resolve
pub async fn resolve_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ResolveRequest>,
) -> ApiResult<Json<ResolveResponse>> {
    let part_id = request
        .part_id
        .map(PartIdInput::into_string)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("part_id is required".to_string()))?;

    let resolver = state.resolver()?;
    let summary = resolver
        .resolve(id, item_id, &part_id, &request.fallback)
        .await?;

    Ok(Json(ResolveResponse {
        success: true,
        enriched_count: summary.enriched_count,
        enrichable_total: summary.enrichable_total,
    }))
}

pub fn resolution_routes() -> Router<AppState> {
    Router::new()
        .route("/assemblies/:id/items/failed", get(list_failed_items))
        .route(
            "/assemblies/:id/items/:item_id/candidates",
            get(get_candidates),
        )
        .route("/assemblies/:id/items/:item_id/resolve", post(resolve_item))
}
