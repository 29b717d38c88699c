//! HTTP API handlers for birdex-indexer
//!
//! REST endpoints for scanning and tree export, plus an SSE event stream.

pub mod catalog;
pub mod health;
pub mod scan;
pub mod sse;
pub mod tree;

pub use catalog::catalog_routes;
pub use health::health_routes;
pub use scan::scan_routes;
pub use sse::event_routes;
pub use tree::tree_routes;
