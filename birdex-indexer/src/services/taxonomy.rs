//! Taxonomic aggregation tree
//!
//! Fixed-depth tree Root → Order → Family → Genus → Species. Photos hang
//! only off Species leaves. Nodes own their children outright; there are no
//! back-references.
//!
//! Photo totals are computed on demand. With a depth of five the recursion
//! is cheap, and a live sum cannot drift from the photo lists.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::{PhotoRecord, SpeciesRecord};

/// Taxonomic rank of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    Root,
    Order,
    Family,
    Genus,
    Species,
}

impl Rank {
    /// Rank one level below, `None` for Species
    pub fn child(self) -> Option<Rank> {
        match self {
            Rank::Root => Some(Rank::Order),
            Rank::Order => Some(Rank::Family),
            Rank::Family => Some(Rank::Genus),
            Rank::Genus => Some(Rank::Species),
            Rank::Species => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Root => "Root",
            Rank::Order => "Order",
            Rank::Family => "Family",
            Rank::Genus => "Genus",
            Rank::Species => "Species",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tree node
///
/// Children are keyed by name and kept sorted, so exports are deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonNode {
    rank: Rank,
    name: String,
    children: BTreeMap<String, TaxonNode>,
    photos: Vec<PhotoRecord>,
}

impl TaxonNode {
    pub fn new(rank: Rank, name: impl Into<String>) -> Self {
        Self {
            rank,
            name: name.into(),
            children: BTreeMap::new(),
            photos: Vec::new(),
        }
    }

    /// Empty root node
    pub fn root(name: impl Into<String>) -> Self {
        Self::new(Rank::Root, name)
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Photos attached directly to this node
    pub fn photos(&self) -> &[PhotoRecord] {
        &self.photos
    }

    pub fn children(&self) -> impl Iterator<Item = &TaxonNode> {
        self.children.values()
    }

    pub fn child(&self, name: &str) -> Option<&TaxonNode> {
        self.children.get(name)
    }

    /// Own photos plus the totals of all children
    pub fn total_photos(&self) -> usize {
        self.photos.len()
            + self
                .children
                .values()
                .map(TaxonNode::total_photos)
                .sum::<usize>()
    }

    /// File `photo` under the species' Order → Family → Genus → Species path
    ///
    /// Missing nodes are created; existing ones are reused.
    pub fn insert(&mut self, photo: PhotoRecord, species: &SpeciesRecord) {
        let path = [
            (Rank::Order, species.order.as_str()),
            (Rank::Family, species.family.as_str()),
            (Rank::Genus, species.genus.as_str()),
        ];

        let mut node = self;
        for (rank, name) in path {
            node = node.child_entry(rank, name);
        }
        let leaf = node.child_entry(Rank::Species, &species.leaf_name());
        leaf.photos.push(photo);
    }

    fn child_entry(&mut self, rank: Rank, name: &str) -> &mut TaxonNode {
        self.children
            .entry(name.to_string())
            .or_insert_with(|| TaxonNode::new(rank, name))
    }

    /// Follow a path of child names from this node
    pub fn find_path(&self, names: &[&str]) -> Option<&TaxonNode> {
        names
            .iter()
            .try_fold(self, |node, name| node.children.get(*name))
    }

    /// Number of Species leaves below this node
    pub fn leaf_count(&self) -> usize {
        if self.rank == Rank::Species {
            return 1;
        }
        self.children.values().map(TaxonNode::leaf_count).sum()
    }

    /// True when every child sits exactly one rank below its parent, every
    /// leaf is a Species node, and only Species nodes hold photos
    pub fn ranks_are_consistent(&self) -> bool {
        if self.rank != Rank::Species && !self.photos.is_empty() {
            return false;
        }
        if self.children.is_empty() {
            return self.rank == Rank::Species || self.rank == Rank::Root;
        }
        let expected = self.rank.child();
        self.children
            .values()
            .all(|c| Some(c.rank) == expected && c.ranks_are_consistent())
    }

    /// Export view for the presentation layer
    ///
    /// Children with no photos are left out. Only Species nodes carry the
    /// photo list.
    pub fn render(&self) -> TreeNodeView {
        let count = self.total_photos();

        let photo: Option<Vec<PhotoRef>> = (self.rank == Rank::Species).then(|| {
            self.photos
                .iter()
                .map(|p| PhotoRef {
                    name: p.file_name.clone(),
                    path: p.absolute_path.clone(),
                })
                .collect()
        });

        let children: Vec<TreeNodeView> = self
            .children
            .values()
            .filter(|c| c.total_photos() > 0)
            .map(TaxonNode::render)
            .collect();

        TreeNodeView {
            id: format!("{}-{}", self.rank, self.name.replace(' ', "_")),
            label: format!("{} ({})", self.name, count),
            rank: self.rank,
            photocount: count,
            photo,
            children: (!children.is_empty()).then_some(children),
        }
    }

    /// Indented text outline, one node per line
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(&mut out, 0);
        out
    }

    fn write_outline(&self, out: &mut String, depth: usize) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!(
            "{} {} (Photos: {})\n",
            self.rank,
            self.name,
            self.total_photos()
        ));
        for photo in &self.photos {
            out.push_str(&"  ".repeat(depth + 1));
            out.push_str(&photo.file_name);
            out.push('\n');
        }
        for child in self.children.values() {
            child.write_outline(out, depth + 1);
        }
    }
}

/// Exported tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNodeView {
    pub id: String,
    pub label: String,
    pub rank: Rank,
    pub photocount: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<PhotoRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNodeView>>,
}

impl TreeNodeView {
    /// Sum of `photocount` over all Species nodes in this view
    pub fn species_photo_total(&self) -> usize {
        if self.rank == Rank::Species {
            return self.photocount;
        }
        self.children
            .iter()
            .flatten()
            .map(TreeNodeView::species_photo_total)
            .sum()
    }
}

/// Photo entry of an exported Species node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
    pub name: String,
    pub path: String,
}
