//! birdex-indexer library interface
//!
//! Exposes the indexing services and the HTTP router for the binary and
//! for integration tests.

pub mod api;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult, IndexerError};

use axum::Router;
use birdex_common::config::{ScanSettings, TomlConfig};
use birdex_common::events::{EventBus, IndexEvent};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::models::ScanSession;
use crate::services::{load_catalog_file, PhotoRegistry};

/// Application state shared across handlers
///
/// Locks are `parking_lot` locks: scan progress is written from blocking
/// worker threads, and no guard is held across an `.await`.
#[derive(Clone)]
pub struct AppState {
    /// Catalog, taxonomy tree and photo list
    pub registry: Arc<PhotoRegistry>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Most recent scan session (running or finished)
    pub session: Arc<RwLock<Option<ScanSession>>>,
    /// Cancellation token of the running scan
    ///
    /// Installed and cleared under the `session` write lock.
    pub cancel_token: Arc<RwLock<Option<CancellationToken>>>,
    /// Set while `POST /api/catalog/reload` is swapping the catalog
    pub catalog_reloading: Arc<AtomicBool>,
    /// Scanner settings from the config file
    pub scan_settings: ScanSettings,
    /// Catalog file used by the reload endpoint
    pub catalog_path: Option<PathBuf>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(registry: Arc<PhotoRegistry>, event_bus: EventBus, config: &TomlConfig) -> Self {
        Self {
            registry,
            event_bus,
            session: Arc::new(RwLock::new(None)),
            cancel_token: Arc::new(RwLock::new(None)),
            catalog_reloading: Arc::new(AtomicBool::new(false)),
            scan_settings: config.scan.clone(),
            catalog_path: config.catalog_path.clone(),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember an error for `/health`
    pub fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write() = Some(message.into());
    }

    /// Claim the catalog for a reload
    ///
    /// Refused while a scan is running or another reload holds the claim.
    /// The check runs under the session lock, and `start_scan` checks the
    /// claim under the same lock, so a reload and a scan never overlap.
    pub fn begin_catalog_reload(&self) -> Result<CatalogReloadGuard, ApiError> {
        let session = self.session.read();
        if session.as_ref().is_some_and(ScanSession::is_running) {
            return Err(ApiError::Conflict(
                "Cannot reload catalog while a scan is running".to_string(),
            ));
        }
        if self.catalog_reloading.swap(true, Ordering::SeqCst) {
            return Err(ApiError::Conflict(
                "Catalog reload already in progress".to_string(),
            ));
        }
        Ok(CatalogReloadGuard(Arc::clone(&self.catalog_reloading)))
    }

    /// True while a catalog reload holds its claim
    pub fn catalog_reloading(&self) -> bool {
        self.catalog_reloading.load(Ordering::SeqCst)
    }
}

/// Reload claim; released on drop, including on error paths
pub struct CatalogReloadGuard(Arc<AtomicBool>);

impl Drop for CatalogReloadGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Load a catalog file into the registry
///
/// Any failure leaves the registry with an empty catalog. Returns the
/// species count on success.
pub fn load_catalog(registry: &PhotoRegistry, path: &Path) -> Result<usize, IndexerError> {
    let records = match load_catalog_file(path) {
        Ok(records) => records,
        Err(e) => {
            registry.clear_catalog();
            error!(path = %path.display(), error = %e, "Catalog file unusable, continuing with empty catalog");
            return Err(e.into());
        }
    };
    Ok(registry.load_catalog(records)?)
}

/// Load a catalog and announce the result on the event bus
///
/// A `CatalogLoaded` event is emitted either way; after a failure it
/// reports zero species.
pub fn load_catalog_and_notify(
    registry: &PhotoRegistry,
    event_bus: &EventBus,
    path: &Path,
) -> Result<usize, IndexerError> {
    let result = load_catalog(registry, path);
    let catalog = registry.catalog();
    event_bus.emit_lossy(IndexEvent::CatalogLoaded {
        species: catalog.len(),
        keys: catalog.keys().len(),
        timestamp: birdex_common::time::now(),
    });
    result
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::scan_routes())
        .merge(api::catalog_routes())
        .merge(api::tree_routes())
        .merge(api::event_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
