//! HTTP error type for lcm-enrich
//!
//! Every handler returns [`ApiResult`]; errors render as
//! `{ "error": { "code": "...", "message": "..." } }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{OrchestratorError, ResolutionError, SourceError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. an enrichment run is already active
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Parts source not configured (503)
    #[error("Service not configured: {0}")]
    NotConfigured(String),

    /// Parts source rejected our credentials (502)
    #[error("{0}")]
    SourceAuth(String),

    /// Parts source failed (502)
    #[error("{0}")]
    Source(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::NotConfigured(_) => (StatusCode::SERVICE_UNAVAILABLE, "NOT_CONFIGURED"),
            ApiError::SourceAuth(_) => (StatusCode::BAD_GATEWAY, "SOURCE_AUTH_FAILED"),
            ApiError::Source(_) => (StatusCode::BAD_GATEWAY, "SOURCE_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let message = match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::NotConfigured(msg)
            | ApiError::SourceAuth(msg)
            | ApiError::Source(msg)
            | ApiError::Internal(msg) => msg,
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<lcm_common::Error> for ApiError {
    fn from(err: lcm_common::Error) -> Self {
        use lcm_common::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Config(msg) => ApiError::NotConfigured(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<SourceError> for ApiError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Configuration(_) => ApiError::NotConfigured(err.to_string()),
            SourceError::Authentication(_) => ApiError::SourceAuth(err.to_string()),
            _ => ApiError::Source(err.to_string()),
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Source(e) => e.into(),
            OrchestratorError::Store(e) => e.into(),
        }
    }
}

impl From<ResolutionError> for ApiError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Source(e) => e.into(),
            ResolutionError::Store(e) => e.into(),
            ResolutionError::Session(e) => ApiError::Conflict(e.to_string()),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_status() {
        let not_found: ApiError = lcm_common::Error::NotFound("Assembly x".to_string()).into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let invalid: ApiError = lcm_common::Error::InvalidInput("empty".to_string()).into();
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_source_errors_map_to_bad_gateway() {
        let auth: ApiError = SourceError::Authentication("Invalid API key".to_string()).into();
        assert!(matches!(auth, ApiError::SourceAuth(ref m) if m.contains("Invalid API key")));
        assert_eq!(auth.into_response().status(), StatusCode::BAD_GATEWAY);

        let unconfigured: ApiError = SourceError::Configuration("no key".to_string()).into();
        assert_eq!(
            unconfigured.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
