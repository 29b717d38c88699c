//! Photo registry
//!
//! Context object owning the species catalog, the taxonomy tree and the
//! flat photo list. Created once and shared (`Arc<PhotoRegistry>`) with the
//! scanner and the HTTP layer; independent registries can coexist.
//!
//! **Locking:**
//! - The catalog is immutable and swapped whole on reload. Readers clone
//!   the `Arc` and never hold the lock while matching.
//! - Tree and photo list sit behind one writer lock, so an insert updates
//!   both atomically and concurrent inserts into the same Order/Family/Genus
//!   path cannot lose updates.

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::models::{PhotoRecord, SpeciesRecord};
use crate::services::catalog::{CatalogError, SpeciesCatalog};
use crate::services::taxonomy::{TaxonNode, TreeNodeView};

/// Registry invariant violations
///
/// These mean the scanner and the registry disagree about the catalog.
/// They are programming errors and must reach the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Photo submitted without a species id
    #[error("Photo {0} has no matched species")]
    Unmatched(String),

    /// Photo references a species id absent from the catalog
    #[error("Photo {path} references unknown species '{species_id}'")]
    UnknownSpecies { path: String, species_id: String },
}

struct RegistryState {
    tree: TaxonNode,
    photos: Vec<PhotoRecord>,
}

/// Photo registry
pub struct PhotoRegistry {
    catalog: RwLock<Arc<SpeciesCatalog>>,
    state: RwLock<RegistryState>,
    root_name: String,
}

impl PhotoRegistry {
    /// Empty registry; the tree root is labelled `root_name`
    pub fn new(root_name: impl Into<String>) -> Self {
        let root_name = root_name.into();
        Self {
            catalog: RwLock::new(Arc::new(SpeciesCatalog::empty())),
            state: RwLock::new(RegistryState {
                tree: TaxonNode::root(root_name.clone()),
                photos: Vec::new(),
            }),
            root_name,
        }
    }

    /// Build and install a catalog from species records
    ///
    /// On failure the registry falls back to an empty catalog (nothing will
    /// match) and the error is returned. Returns the species count.
    pub fn load_catalog(&self, records: Vec<SpeciesRecord>) -> Result<usize, CatalogError> {
        match SpeciesCatalog::build(records) {
            Ok(catalog) => {
                let count = catalog.len();
                *self.catalog.write() = Arc::new(catalog);
                info!(species = count, "Catalog installed");
                Ok(count)
            }
            Err(e) => {
                self.clear_catalog();
                error!(error = %e, "Catalog build failed, continuing with empty catalog");
                Err(e)
            }
        }
    }

    /// Install an empty catalog; nothing matches until the next load
    pub fn clear_catalog(&self) {
        *self.catalog.write() = Arc::new(SpeciesCatalog::empty());
    }

    /// Snapshot of the current catalog
    pub fn catalog(&self) -> Arc<SpeciesCatalog> {
        Arc::clone(&self.catalog.read())
    }

    /// Species id matched by `file_name` against the current catalog
    pub fn match_file(&self, file_name: &str) -> Option<String> {
        self.catalog().match_file(file_name).map(str::to_string)
    }

    /// Add a matched photo to the tree and the flat list
    ///
    /// Photos are not deduplicated: registering the same path twice files
    /// it twice.
    pub fn register_photo(&self, photo: PhotoRecord) -> Result<(), RegistryError> {
        let catalog = self.catalog();
        self.register_photo_in(&catalog, photo)
    }

    /// Register against a catalog snapshot the caller already holds
    ///
    /// A scan matches filenames against the snapshot it took at the start of
    /// a root, so it must resolve the species in that same snapshot. A
    /// catalog swapped in mid-walk does not affect the running root.
    pub fn register_photo_in(
        &self,
        catalog: &SpeciesCatalog,
        photo: PhotoRecord,
    ) -> Result<(), RegistryError> {
        let species_id = photo
            .matched_species_id
            .as_deref()
            .ok_or_else(|| RegistryError::Unmatched(photo.absolute_path.clone()))?;
        let species = catalog
            .get(species_id)
            .ok_or_else(|| RegistryError::UnknownSpecies {
                path: photo.absolute_path.clone(),
                species_id: species_id.to_string(),
            })?;

        debug!(path = %photo.absolute_path, species = %species.id, "Registering photo");

        let mut state = self.state.write();
        state.tree.insert(photo.clone(), species);
        state.photos.push(photo);
        Ok(())
    }

    /// Read-only view of the tree root
    ///
    /// Holds the registry read lock until dropped; writers wait meanwhile.
    pub fn query_tree(&self) -> MappedRwLockReadGuard<'_, TaxonNode> {
        RwLockReadGuard::map(self.state.read(), |s| &s.tree)
    }

    /// Export view of the whole tree
    pub fn render_tree(&self) -> TreeNodeView {
        self.query_tree().render()
    }

    /// Copy of the flat photo list in registration order
    pub fn photos(&self) -> Vec<PhotoRecord> {
        self.state.read().photos.clone()
    }

    pub fn photo_count(&self) -> usize {
        self.state.read().photos.len()
    }

    /// Drop every registered photo and reset the tree
    pub fn clear_photos(&self) {
        let mut state = self.state.write();
        state.tree = TaxonNode::root(self.root_name.clone());
        state.photos.clear();
        info!("Registry cleared");
    }
}

impl Default for PhotoRegistry {
    fn default() -> Self {
        Self::new("World Birds")
    }
}
