//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use birdex_common::time::seconds_since;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" while the catalog is empty
    pub status: String,
    /// Module name ("birdex-indexer")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Git commit the binary was built from
    pub git_hash: String,
    pub build_timestamp: String,
    pub build_profile: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Species in the loaded catalog
    pub species: usize,
    /// Registered photos
    pub photos: usize,
    /// Last error message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let species = state.registry.catalog().len();
    let status = if species == 0 { "degraded" } else { "ok" };

    Json(HealthResponse {
        status: status.to_string(),
        module: "birdex-indexer".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
        uptime_seconds: seconds_since(state.startup_time),
        species,
        photos: state.registry.photo_count(),
        last_error: state.last_error.read().clone(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
