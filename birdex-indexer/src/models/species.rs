//! Species catalog records

use serde::{Deserialize, Serialize};

/// Authoritative species entry
///
/// `id` is the canonical scientific binomial. `genus` is the first token of
/// the scientific name. `search_keys` holds the case-folded common and
/// scientific names, common name first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    pub id: String,
    pub order: String,
    pub family: String,
    pub genus: String,
    pub scientific_name: String,
    pub common_name: String,
    #[serde(default)]
    pub search_keys: Vec<String>,
}

impl SpeciesRecord {
    /// Build a record from the four catalog columns
    ///
    /// Inputs are trimmed. Blank names produce no search key, so a record
    /// built from blank columns is rejected later by `SpeciesCatalog::build`.
    pub fn new(order: &str, family: &str, scientific_name: &str, common_name: &str) -> Self {
        let scientific_name = scientific_name.trim().to_string();
        let common_name = common_name.trim().to_string();
        let genus = genus_of(&scientific_name);
        let search_keys = derive_search_keys(&common_name, &scientific_name);

        Self {
            id: scientific_name.clone(),
            order: order.trim().to_string(),
            family: family.trim().to_string(),
            genus,
            scientific_name,
            common_name,
            search_keys,
        }
    }

    /// Name of the species leaf in the taxonomy tree
    ///
    /// Combines common and scientific names so two species sharing a common
    /// name still get distinct leaves.
    pub fn leaf_name(&self) -> String {
        format!("{} {}", self.common_name, self.scientific_name)
    }
}

/// First whitespace-separated token of a scientific name
pub fn genus_of(scientific_name: &str) -> String {
    scientific_name
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Case-fold a name or filename for matching
///
/// Lowercases and maps `_` to a space, since filenames commonly use
/// underscores where catalog names use spaces.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase().replace('_', " ")
}

/// Search keys for a species: folded common name, then folded scientific name
///
/// Blank names are skipped and a scientific name equal to the common name is
/// not repeated.
pub fn derive_search_keys(common_name: &str, scientific_name: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(2);
    for name in [common_name, scientific_name] {
        let key = fold_case(name.trim());
        if !key.is_empty() && !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}
