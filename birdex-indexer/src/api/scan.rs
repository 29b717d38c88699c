//! Scan workflow API handlers
//!
//! POST /api/scan, GET /api/status, POST /api/scan/cancel

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use birdex_common::events::IndexEvent;
use birdex_common::time::{elapsed_ms, now};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{ScanSession, ScanState, ScanStatus};
use crate::services::{DirectoryScanner, ScanCounts};
use crate::AppState;

/// POST /api/scan request
#[derive(Debug, Deserialize)]
pub struct StartScanRequest {
    /// Root folders to scan
    pub paths: Vec<String>,
    /// Drop previously registered photos before scanning
    #[serde(default)]
    pub reset: bool,
}

/// POST /api/scan response
#[derive(Debug, Serialize)]
pub struct StartScanResponse {
    pub message: String,
    pub status: ScanState,
    pub session_id: Uuid,
}

/// POST /api/scan/cancel response
#[derive(Debug, Serialize)]
pub struct CancelScanResponse {
    pub message: String,
    pub session_id: Uuid,
}

/// POST /api/scan
///
/// Starts a background scan session. Returns 202 Accepted immediately.
pub async fn start_scan(
    State(state): State<AppState>,
    Json(request): Json<StartScanRequest>,
) -> ApiResult<(StatusCode, Json<StartScanResponse>)> {
    let roots: Vec<String> = request
        .paths
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if roots.is_empty() {
        return Err(ApiError::BadRequest("No paths provided".to_string()));
    }

    // Check and install under one lock so two requests cannot both start.
    // The token goes in under the same lock, so a running session always
    // has one to cancel.
    let (session, cancel) = {
        let mut current = state.session.write();
        if current.as_ref().is_some_and(ScanSession::is_running) {
            return Err(ApiError::Conflict("Scan already in progress".to_string()));
        }
        if state.catalog_reloading() {
            return Err(ApiError::Conflict("Catalog reload in progress".to_string()));
        }
        let session = ScanSession::start(roots.clone());
        let cancel = CancellationToken::new();
        *current = Some(session.clone());
        *state.cancel_token.write() = Some(cancel.clone());
        (session, cancel)
    };

    if request.reset {
        state.registry.clear_photos();
    }

    tracing::info!(
        session_id = %session.session_id,
        roots = ?roots,
        reset = request.reset,
        "Scan session started"
    );
    state.event_bus.emit_lossy(IndexEvent::ScanStarted {
        session_id: session.session_id,
        roots: roots.clone(),
        timestamp: now(),
    });

    tokio::spawn(run_scan_session(state.clone(), session.session_id, roots, cancel));

    Ok((
        StatusCode::ACCEPTED,
        Json(StartScanResponse {
            message: "Scan started".to_string(),
            status: session.state,
            session_id: session.session_id,
        }),
    ))
}

/// GET /api/status
///
/// Live counts of the current or most recent session; idle before the
/// first scan.
pub async fn get_status(State(state): State<AppState>) -> Json<ScanStatus> {
    let status = state
        .session
        .read()
        .as_ref()
        .map(ScanSession::status)
        .unwrap_or_default();
    Json(status)
}

/// POST /api/scan/cancel
pub async fn cancel_scan(State(state): State<AppState>) -> ApiResult<Json<CancelScanResponse>> {
    let not_found = || ApiError::NotFound("No scan in progress".to_string());
    let session_id = {
        let current = state.session.read();
        let session_id = current
            .as_ref()
            .filter(|s| s.is_running())
            .map(|s| s.session_id)
            .ok_or_else(not_found)?;
        state.cancel_token.read().as_ref().ok_or_else(not_found)?.cancel();
        session_id
    };

    tracing::info!(session_id = %session_id, "Scan cancellation requested");
    Ok(Json(CancelScanResponse {
        message: "Cancellation requested".to_string(),
        session_id,
    }))
}

/// Background task driving one scan session
///
/// The directory walk runs on the blocking pool; progress is mirrored into
/// the session and onto the event bus as it happens.
async fn run_scan_session(
    state: AppState,
    session_id: Uuid,
    roots: Vec<String>,
    cancel: CancellationToken,
) {
    let started = Instant::now();

    let progress_state = state.clone();
    let scanner = DirectoryScanner::new(Arc::clone(&state.registry))
        .with_settings(&state.scan_settings)
        .with_cancellation(cancel)
        .with_progress(Arc::new(move |scanned: usize, matched: usize| {
            if let Some(session) = progress_state
                .session
                .write()
                .as_mut()
                .filter(|s| s.session_id == session_id)
            {
                session.update_progress(scanned, matched);
            }
            progress_state.event_bus.emit_lossy(IndexEvent::ScanProgress {
                session_id,
                scanned,
                matched,
                timestamp: now(),
            });
        }));

    let paths: Vec<PathBuf> = roots.iter().map(PathBuf::from).collect();
    let result = tokio::task::spawn_blocking(move || scanner.scan_all(&paths)).await;

    let outcome: Result<ScanCounts, String> = match result {
        Ok(Ok(counts)) => Ok(counts),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("Scan task panicked: {}", e)),
    };

    match outcome {
        Ok(counts) => {
            finish_session(&state, session_id, |session| {
                session.complete(counts.scanned, counts.matched, counts.cancelled)
            });
            tracing::info!(
                session_id = %session_id,
                scanned = counts.scanned,
                matched = counts.matched,
                cancelled = counts.cancelled,
                "Scan session completed"
            );
            state.event_bus.emit_lossy(IndexEvent::ScanCompleted {
                session_id,
                scanned: counts.scanned,
                matched: counts.matched,
                cancelled: counts.cancelled,
                duration_ms: elapsed_ms(started),
                timestamp: now(),
            });
        }
        Err(error) => {
            finish_session(&state, session_id, |session| session.fail(error.clone()));
            tracing::error!(session_id = %session_id, error = %error, "Scan session failed");
            state.record_error(error.clone());
            state.event_bus.emit_lossy(IndexEvent::ScanFailed {
                session_id,
                error,
                timestamp: now(),
            });
        }
    }
}

/// Record the outcome of `session_id` and retire its cancellation token
///
/// Both happen under the session write lock, so the next scan cannot be
/// installed in between. Returns false, touching nothing, when `session_id`
/// is no longer the current session.
fn finish_session(
    state: &AppState,
    session_id: Uuid,
    finish: impl FnOnce(&mut ScanSession),
) -> bool {
    let mut current = state.session.write();
    match current.as_mut().filter(|s| s.session_id == session_id) {
        Some(session) => {
            *state.cancel_token.write() = None;
            finish(session);
            true
        }
        None => false,
    }
}

/// Build scan workflow routes
pub fn scan_routes() -> Router<AppState> {
    Router::new()
        .route("/api/scan", post(start_scan))
        .route("/api/scan/cancel", post(cancel_scan))
        .route("/api/status", get(get_status))
}
