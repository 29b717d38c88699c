//! Photo index records

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A photo file found by the scanner
///
/// Files are never moved or renamed; `absolute_path` is only a pointer back
/// to the original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub file_name: String,
    pub absolute_path: String,
    /// `SpeciesRecord::id` of the matched species
    pub matched_species_id: Option<String>,
}

impl PhotoRecord {
    /// Record for a file matched to `species_id`
    pub fn matched(path: &Path, species_id: impl Into<String>) -> Self {
        Self {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            absolute_path: path.to_string_lossy().into_owned(),
            matched_species_id: Some(species_id.into()),
        }
    }
}
