//! Assembly import and browsing

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{assemblies, line_items};
use crate::models::{Assembly, LineItem, LineItemInput};
use crate::{ApiError, ApiResult, AppState};

/// POST /assemblies request
#[derive(Debug, Deserialize)]
pub struct CreateAssemblyRequest {
    pub name: String,
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub items: Vec<LineItemInput>,
}

/// GET /assemblies/{id} response
#[derive(Debug, Serialize)]
pub struct AssemblyDetail {
    pub assembly: Assembly,
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Serialize)]
pub struct AssemblyList {
    pub assemblies: Vec<Assembly>,
}

/// POST /assemblies
pub async fn create_assembly(
    State(state): State<AppState>,
    Json(request): Json<CreateAssemblyRequest>,
) -> ApiResult<(StatusCode, Json<Assembly>)> {
    if request.items.is_empty() {
        return Err(ApiError::BadRequest("No line items to import".to_string()));
    }

    let assembly =
        assemblies::import_assembly(&state.db, &request.name, &request.customer, &request.items)
            .await?;

    Ok((StatusCode::CREATED, Json(assembly)))
}

/// GET /assemblies
pub async fn list_assemblies(State(state): State<AppState>) -> ApiResult<Json<AssemblyList>> {
    let assemblies = assemblies::list_assemblies(&state.db).await?;
    Ok(Json(AssemblyList { assemblies }))
}

/// GET /assemblies/{id}
pub async fn get_assembly(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AssemblyDetail>> {
    let assembly = assemblies::require_assembly(&state.db, id).await?;
    let line_items = line_items::list_all(&state.db, id).await?;
    Ok(Json(AssemblyDetail {
        assembly,
        line_items,
    }))
}

/// DELETE /assemblies/{id}
pub async fn delete_assembly(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.is_run_active(id).await {
        return Err(ApiError::Conflict(format!(
            "Enrichment run active for assembly {}",
            id
        )));
    }

    if !assemblies::delete_assembly(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("Assembly {}", id)));
    }

    tracing::info!(assembly_id = %id, "Deleted assembly");
    Ok(StatusCode::NO_CONTENT)
}

pub fn assembly_routes() -> Router<AppState> {
    Router::new()
        .route("/assemblies", get(list_assemblies).post(create_assembly))
        .route("/assemblies/:id", get(get_assembly).delete(delete_assembly))
}
