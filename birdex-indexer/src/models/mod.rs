//! Data models for birdex-indexer

pub mod photo;
pub mod scan_session;
pub mod species;

pub use photo::PhotoRecord;
pub use scan_session::{ScanSession, ScanState, ScanStatus};
pub use species::{derive_search_keys, fold_case, genus_of, SpeciesRecord};
