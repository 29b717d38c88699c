//! Test helper utilities
//!
//! Shared fixtures for birdex-indexer integration tests

#![allow(dead_code)]

pub mod log_capture;

use birdex_indexer::models::SpeciesRecord;
use birdex_indexer::services::PhotoRegistry;
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub use log_capture::{capture_logs, LogCapture};

pub fn house_sparrow() -> SpeciesRecord {
    SpeciesRecord::new("Passeriformes", "Passeridae", "Passer domesticus", "House Sparrow")
}

pub fn grey_heron() -> SpeciesRecord {
    SpeciesRecord::new("Pelecaniformes", "Ardeidae", "Ardea cinerea", "Grey Heron")
}

/// Registry with the given species loaded
pub fn registry_with(species: Vec<SpeciesRecord>) -> Arc<PhotoRegistry> {
    let registry = PhotoRegistry::default();
    registry.load_catalog(species).unwrap();
    Arc::new(registry)
}

/// Create empty files (content is never read)
pub fn touch_all(dir: &Path, names: &[&str]) {
    for name in names {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }
}

/// Catalog JSON rows for the given species
pub fn catalog_json(species: &[SpeciesRecord]) -> String {
    let rows: Vec<serde_json::Value> = species
        .iter()
        .map(|s| {
            serde_json::json!({
                "order": s.order,
                "family": s.family,
                "scientific_name": s.scientific_name,
                "common_name": s.common_name,
            })
        })
        .collect();
    serde_json::to_string(&rows).unwrap()
}
