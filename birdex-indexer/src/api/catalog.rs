//! Catalog endpoints
//!
//! GET /api/catalog reports the loaded catalog; POST /api/catalog/reload
//! re-reads the configured catalog file.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Catalog summary
#[derive(Debug, Serialize)]
pub struct CatalogSummary {
    pub species: usize,
    pub keys: usize,
    /// Keys dropped because an earlier species registered them first
    pub collisions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn summary(state: &AppState) -> CatalogSummary {
    let catalog = state.registry.catalog();
    CatalogSummary {
        species: catalog.len(),
        keys: catalog.engine().key_count(),
        collisions: catalog.engine().collisions(),
        path: state
            .catalog_path
            .as_ref()
            .map(|p| p.display().to_string()),
    }
}

/// GET /api/catalog
pub async fn get_catalog(State(state): State<AppState>) -> Json<CatalogSummary> {
    Json(summary(&state))
}

/// POST /api/catalog/reload
///
/// Refused while a scan is running (409), and no scan can start until the
/// reload finishes. A failed reload leaves the service with an empty
/// catalog and reports the error.
pub async fn reload_catalog(State(state): State<AppState>) -> ApiResult<Json<CatalogSummary>> {
    let path = state
        .catalog_path
        .clone()
        .ok_or_else(|| ApiError::BadRequest("No catalog path configured".to_string()))?;

    let _claim = state.begin_catalog_reload()?;

    let registry = state.registry.clone();
    let event_bus = state.event_bus.clone();
    let result = tokio::task::spawn_blocking(move || {
        crate::load_catalog_and_notify(&registry, &event_bus, &path)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Catalog reload task failed: {}", e)))?;

    if let Err(e) = result {
        state.record_error(e.to_string());
        return Err(e.into());
    }

    Ok(Json(summary(&state)))
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/catalog", get(get_catalog))
        .route("/api/catalog/reload", post(reload_catalog))
}
