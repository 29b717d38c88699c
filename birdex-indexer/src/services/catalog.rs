//! Species catalog
//!
//! Immutable collection of species records plus the match engine compiled
//! from their search keys. Built once per catalog load, then shared
//! read-only (behind `Arc`) by the registry and every scanner thread.

use std::collections::HashMap;
use thiserror::Error;
use tracing::info;

use crate::models::{fold_case, genus_of, SpeciesRecord};
use crate::services::match_engine::{MatchEngine, SearchKey};

/// Catalog build errors
///
/// Any error rejects the whole input: no partial catalog is produced.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A record has a blank required field
    #[error("Species record #{index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    /// A record yields no usable search key
    #[error("Species record '{id}' has no search keys")]
    NoSearchKeys { id: String },

    /// Two records share an id
    #[error("Duplicate species id '{id}'")]
    DuplicateId { id: String },

    /// Match automaton could not be constructed
    #[error("Failed to build match automaton: {0}")]
    Automaton(#[from] aho_corasick::BuildError),
}

/// Species catalog with derived lookup keys
#[derive(Debug, Clone, Default)]
pub struct SpeciesCatalog {
    species: Vec<SpeciesRecord>,
    by_id: HashMap<String, usize>,
    engine: MatchEngine,
}

impl SpeciesCatalog {
    /// Catalog with no species; matches nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate records and compile their search keys
    ///
    /// A blank genus is taken from the scientific name; a record whose genus
    /// is still blank after that is rejected.
    ///
    /// Each record's keys are folded and registered in record order, keys
    /// within a record in their stored order. A key already registered by
    /// an earlier species is kept by that species.
    pub fn build(records: Vec<SpeciesRecord>) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(records.len());
        let mut species = Vec::with_capacity(records.len());

        for (index, mut record) in records.into_iter().enumerate() {
            require(index, "id", &record.id)?;
            require(index, "order", &record.order)?;
            require(index, "family", &record.family)?;
            if record.genus.trim().is_empty() {
                record.genus = genus_of(&record.scientific_name);
            }
            require(index, "genus", &record.genus)?;

            record.search_keys = fold_keys(&record.search_keys);
            if record.search_keys.is_empty() {
                return Err(CatalogError::NoSearchKeys { id: record.id });
            }
            if by_id.insert(record.id.clone(), index).is_some() {
                return Err(CatalogError::DuplicateId { id: record.id });
            }
            species.push(record);
        }

        let engine = MatchEngine::build(species.iter().flat_map(|s| {
            s.search_keys
                .iter()
                .map(move |key| (key.as_str(), s.id.as_str()))
        }))?;

        info!(
            species = species.len(),
            keys = engine.key_count(),
            collisions = engine.collisions(),
            "Species catalog built"
        );

        Ok(Self {
            species,
            by_id,
            engine,
        })
    }

    /// Species id matched by a filename, if any
    pub fn match_file(&self, file_name: &str) -> Option<&str> {
        self.engine.find(file_name)
    }

    pub fn get(&self, id: &str) -> Option<&SpeciesRecord> {
        self.by_id.get(id).map(|&i| &self.species[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Species in catalog order
    pub fn species(&self) -> impl Iterator<Item = &SpeciesRecord> {
        self.species.iter()
    }

    /// Registered search keys in priority order
    pub fn keys(&self) -> &[SearchKey] {
        self.engine.keys()
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

fn require(index: usize, field: &'static str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        Err(CatalogError::MissingField { index, field })
    } else {
        Ok(())
    }
}

fn fold_keys(keys: &[String]) -> Vec<String> {
    let mut folded: Vec<String> = Vec::with_capacity(keys.len());
    for key in keys {
        let key = fold_case(key.trim());
        if !key.is_empty() && !folded.contains(&key) {
            folded.push(key);
        }
    }
    folded
}
