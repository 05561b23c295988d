//! lcm-enrich library interface
//!
//! BOM enrichment service: resolves line item identifiers against the Z2Data
//! parts database in bounded batches, and supports manual resolution of the
//! items that could not be matched automatically.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use lcm_common::events::EventBus;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::services::{BatchOrchestrator, EnrichmentEngine, ManualResolver, PartsSource};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Parts source; `None` when no API key could be resolved
    pub source: Option<Arc<dyn PartsSource>>,
    /// Cancellation tokens for active enrichment runs, by assembly
    pub cancellation_tokens: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last fatal run error, for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, source: Option<Arc<dyn PartsSource>>) -> Self {
        Self {
            db,
            event_bus,
            source,
            cancellation_tokens: Arc::new(RwLock::new(HashMap::new())),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Configured parts source or 503
    pub fn require_source(&self) -> ApiResult<Arc<dyn PartsSource>> {
        self.source.clone().ok_or_else(|| {
            ApiError::NotConfigured("Z2Data API key is not configured".to_string())
        })
    }

    pub fn orchestrator(&self) -> ApiResult<BatchOrchestrator> {
        let engine = EnrichmentEngine::new(self.require_source()?);
        Ok(BatchOrchestrator::new(
            self.db.clone(),
            engine,
            self.event_bus.clone(),
        ))
    }

    pub fn resolver(&self) -> ApiResult<ManualResolver> {
        Ok(ManualResolver::new(
            self.db.clone(),
            self.require_source()?,
            self.event_bus.clone(),
        ))
    }

    pub async fn is_run_active(&self, assembly_id: Uuid) -> bool {
        self.cancellation_tokens.read().await.contains_key(&assembly_id)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::assembly_routes())
        .merge(api::enrichment_routes())
        .merge(api::resolution_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
