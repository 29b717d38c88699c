//! Server-Sent Events for scan progress streaming

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
    Router,
};
use birdex_common::sse::create_event_sse_stream;
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /api/events
///
/// Streams CatalogLoaded, ScanStarted, ScanProgress, ScanCompleted and
/// ScanFailed events, with periodic heartbeats.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    create_event_sse_stream(&state.event_bus, "birdex-indexer")
}

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/api/events", get(event_stream))
}
