//! Error types for birdex-indexer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{CatalogError, LoadError, RegistryError};

/// Crate-level error
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Catalog could not be built from the loaded records
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Registry invariant violated during a scan
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Catalog file could not be read or parsed
    #[error("Catalog load error: {0}")]
    Load(#[from] LoadError),

    /// birdex-common error
    #[error("Common error: {0}")]
    Common(#[from] birdex_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. scan already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Indexer(#[from] IndexerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Indexer(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INDEXER_ERROR",
                err.to_string(),
            ),
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

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
