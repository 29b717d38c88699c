//! Timestamp utilities

use chrono::{DateTime, Utc};
use std::time::Instant;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds elapsed since `start`, saturating at `u64::MAX`
pub fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Whole seconds between `since` and now, clamped at zero
pub fn seconds_since(since: DateTime<Utc>) -> u64 {
    Utc::now()
        .signed_duration_since(since)
        .num_seconds()
        .max(0) as u64
}
