//! Event types for the Birdex event system
//!
//! Provides the shared event vocabulary and the broadcast [`EventBus`] used
//! to push scan progress to SSE subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Birdex event types
///
/// Serialized with a `type` tag so SSE clients can dispatch on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IndexEvent {
    /// Species catalog (re)loaded
    CatalogLoaded {
        /// Species admitted into the catalog (0 after a failed load)
        species: usize,
        /// Registered search keys after collision resolution
        keys: usize,
        timestamp: DateTime<Utc>,
    },

    /// Scan session started
    ScanStarted {
        session_id: Uuid,
        /// Root paths requested for this session
        roots: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// Cumulative scan counts
    ///
    /// Successive progress events of one session never decrease.
    ScanProgress {
        session_id: Uuid,
        scanned: usize,
        matched: usize,
        timestamp: DateTime<Utc>,
    },

    /// Scan session finished (also emitted after cancellation)
    ScanCompleted {
        session_id: Uuid,
        scanned: usize,
        matched: usize,
        cancelled: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Scan session aborted by an error
    ScanFailed {
        session_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl IndexEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            IndexEvent::CatalogLoaded { .. } => "CatalogLoaded",
            IndexEvent::ScanStarted { .. } => "ScanStarted",
            IndexEvent::ScanProgress { .. } => "ScanProgress",
            IndexEvent::ScanCompleted { .. } => "ScanCompleted",
            IndexEvent::ScanFailed { .. } => "ScanFailed",
        }
    }
}

/// Central event distribution bus
///
/// Wraps a `tokio::sync::broadcast` channel:
/// - publishing never blocks, slow subscribers lag instead
/// - any number of subscribers
/// - subscribers only see events emitted after they subscribed
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IndexEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<IndexEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` when nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: IndexEvent,
    ) -> Result<usize, broadcast::error::SendError<IndexEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the case where no subscribers are listening
    pub fn emit_lossy(&self, event: IndexEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
