//! # Birdex Common Library
//!
//! Shared code for the Birdex crates:
//! - Error types
//! - Bootstrap configuration (TOML + overrides)
//! - Event types and the broadcast event bus
//! - SSE streaming helpers
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
