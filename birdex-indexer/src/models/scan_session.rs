//! Scan session state
//!
//! A session moves IDLE → SCANNING → COMPLETED. Cancellation and failure
//! also end in COMPLETED; the flags on the session say how it ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scan status reported by `GET /api/status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    /// No scan has run yet
    Idle,
    /// A scan is in progress
    Scanning,
    /// The last scan finished
    Completed,
}

/// Pollable status object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatus {
    pub status: ScanState,
    pub scanned: usize,
    pub matched: usize,
}

impl ScanStatus {
    pub fn idle() -> Self {
        Self {
            status: ScanState::Idle,
            scanned: 0,
            matched: 0,
        }
    }
}

impl Default for ScanStatus {
    fn default() -> Self {
        Self::idle()
    }
}

/// One scan request, from start to finish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSession {
    pub session_id: Uuid,
    pub roots: Vec<String>,
    pub state: ScanState,
    pub scanned: usize,
    pub matched: usize,
    pub cancelled: bool,
    /// Error that aborted the scan, if any
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ScanSession {
    /// New session in SCANNING state
    pub fn start(roots: Vec<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            roots,
            state: ScanState::Scanning,
            scanned: 0,
            matched: 0,
            cancelled: false,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Record cumulative progress; counts never move backwards
    pub fn update_progress(&mut self, scanned: usize, matched: usize) {
        self.scanned = self.scanned.max(scanned);
        self.matched = self.matched.max(matched);
    }

    /// Mark the session finished with final counts
    pub fn complete(&mut self, scanned: usize, matched: usize, cancelled: bool) {
        self.scanned = scanned;
        self.matched = matched;
        self.cancelled = cancelled;
        self.state = ScanState::Completed;
        self.ended_at = Some(Utc::now());
    }

    /// Mark the session aborted by an error
    ///
    /// Counts keep whatever progress was reported before the failure.
    pub fn fail(&mut self, error: String) {
        self.error = Some(error);
        self.state = ScanState::Completed;
        self.ended_at = Some(Utc::now());
    }

    pub fn is_running(&self) -> bool {
        self.state == ScanState::Scanning
    }

    pub fn status(&self) -> ScanStatus {
        ScanStatus {
            status: self.state,
            scanned: self.scanned,
            matched: self.matched,
        }
    }
}
