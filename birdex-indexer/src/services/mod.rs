//! Indexing services
//!
//! Catalog construction and matching, the taxonomy tree, the photo registry
//! that ties them together, and the directory scanner that feeds it.

pub mod catalog;
pub mod catalog_loader;
pub mod file_scanner;
pub mod match_engine;
pub mod registry;
pub mod taxonomy;

pub use catalog::{CatalogError, SpeciesCatalog};
pub use catalog_loader::{load_catalog_file, parse_catalog, CatalogRow, LoadError};
pub use file_scanner::{DirectoryScanner, ProgressCallback, ScanCounts, ScanError};
pub use match_engine::{MatchEngine, SearchKey};
pub use registry::{PhotoRegistry, RegistryError};
pub use taxonomy::{PhotoRef, Rank, TaxonNode, TreeNodeView};
