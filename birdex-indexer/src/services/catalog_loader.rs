//! Catalog file ingestion
//!
//! Reads a JSON array of taxonomy rows and turns the complete ones into
//! [`SpeciesRecord`]s. Incomplete rows are dropped here, before the catalog
//! ever sees them.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::SpeciesRecord;

/// Catalog file errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One row of the catalog file
///
/// Every field is optional at this layer so a single bad row does not fail
/// the whole file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogRow {
    #[serde(default, alias = "Order")]
    pub order: Option<String>,
    #[serde(default, alias = "Family")]
    pub family: Option<String>,
    #[serde(default, alias = "scientific", alias = "Scientific")]
    pub scientific_name: Option<String>,
    #[serde(default, alias = "common", alias = "English")]
    pub common_name: Option<String>,
}

impl CatalogRow {
    /// Species record for a complete row, `None` if any field is blank
    pub fn into_record(self) -> Option<SpeciesRecord> {
        let order = non_blank(self.order)?;
        let family = non_blank(self.family)?;
        let scientific = non_blank(self.scientific_name)?;
        let common = non_blank(self.common_name)?;
        Some(SpeciesRecord::new(&order, &family, &scientific, &common))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse catalog rows from a JSON string
pub fn parse_catalog(json: &str) -> Result<Vec<SpeciesRecord>, LoadError> {
    let rows: Vec<CatalogRow> = serde_json::from_str(json)?;
    let total = rows.len();

    let records: Vec<SpeciesRecord> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let record = row.into_record();
            if record.is_none() {
                warn!(row = index, "Skipping incomplete catalog row");
            }
            record
        })
        .collect();

    if records.len() < total {
        warn!(
            skipped = total - records.len(),
            kept = records.len(),
            "Catalog contained incomplete rows"
        );
    }
    Ok(records)
}

/// Read and parse a catalog file
pub fn load_catalog_file(path: &Path) -> Result<Vec<SpeciesRecord>, LoadError> {
    let json = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let records = parse_catalog(&json)?;
    info!(path = %path.display(), species = records.len(), "Catalog file loaded");
    Ok(records)
}
