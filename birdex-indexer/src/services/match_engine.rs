//! Filename → species matching
//!
//! Resolves a filename to at most one species by substring search over the
//! catalog's search keys.
//!
//! **Resolution rule:** every key has a priority equal to its registration
//! index. Among all keys occurring anywhere in the folded filename, the one
//! registered first wins, regardless of where in the filename it occurs.
//!
//! Keys are compiled once into an Aho–Corasick automaton; a query reports
//! every (overlapping) occurrence in one pass over the filename and keeps
//! the minimum pattern index. Query cost depends on the filename length,
//! not on the number of keys.

use aho_corasick::{AhoCorasick, BuildError};
use std::collections::HashMap;
use tracing::debug;

use crate::models::fold_case;

/// A registered search key and the species it resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchKey {
    pub key: String,
    pub species_id: String,
}

/// Multi-pattern filename matcher
///
/// Read-only once built; safe to share between scanner threads.
#[derive(Debug, Clone)]
pub struct MatchEngine {
    /// Keys in registration order; index = pattern id = priority
    keys: Vec<SearchKey>,
    /// `None` when no keys are registered
    automaton: Option<AhoCorasick>,
    /// Keys dropped because an earlier species already registered them
    collisions: usize,
}

impl MatchEngine {
    /// Engine that never matches
    pub fn empty() -> Self {
        Self {
            keys: Vec::new(),
            automaton: None,
            collisions: 0,
        }
    }

    /// Build from `(key, species_id)` pairs in registration order
    ///
    /// Keys are case-folded. Empty keys are ignored. A key already present
    /// keeps its first owner; later registrations are dropped.
    pub fn build<I, K, S>(entries: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = (K, S)>,
        K: AsRef<str>,
        S: Into<String>,
    {
        let mut keys: Vec<SearchKey> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut collisions = 0;

        for (raw_key, species_id) in entries {
            let key = fold_case(raw_key.as_ref());
            if key.is_empty() {
                continue;
            }
            let species_id = species_id.into();
            if let Some(&existing) = seen.get(&key) {
                if keys[existing].species_id != species_id {
                    debug!(
                        key = %key,
                        kept = %keys[existing].species_id,
                        dropped = %species_id,
                        "Search key collision, first registration wins"
                    );
                    collisions += 1;
                }
                continue;
            }
            seen.insert(key.clone(), keys.len());
            keys.push(SearchKey { key, species_id });
        }

        let automaton = if keys.is_empty() {
            None
        } else {
            Some(AhoCorasick::new(keys.iter().map(|k| k.key.as_str()))?)
        };

        Ok(Self {
            keys,
            automaton,
            collisions,
        })
    }

    /// Species id of the highest-priority key contained in `file_name`
    pub fn find(&self, file_name: &str) -> Option<&str> {
        let automaton = self.automaton.as_ref()?;
        let haystack = fold_case(file_name);

        let mut best: Option<usize> = None;
        for m in automaton.find_overlapping_iter(&haystack) {
            let pattern = m.pattern().as_usize();
            if best.map_or(true, |b| pattern < b) {
                best = Some(pattern);
                if pattern == 0 {
                    break;
                }
            }
        }

        best.map(|i| self.keys[i].species_id.as_str())
    }

    /// Reference matcher: scan keys in registration order, first contained wins
    ///
    /// Same result as [`MatchEngine::find`], linear in the number of keys.
    pub fn find_linear(&self, file_name: &str) -> Option<&str> {
        let haystack = fold_case(file_name);
        self.keys
            .iter()
            .find(|k| haystack.contains(k.key.as_str()))
            .map(|k| k.species_id.as_str())
    }

    /// Registered keys in priority order
    pub fn keys(&self) -> &[SearchKey] {
        &self.keys
    }

    /// Species id a key resolves to, if the key is registered
    pub fn resolve_key(&self, key: &str) -> Option<&str> {
        let folded = fold_case(key);
        self.keys
            .iter()
            .find(|k| k.key == folded)
            .map(|k| k.species_id.as_str())
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn collisions(&self) -> usize {
        self.collisions
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::empty()
    }
}
