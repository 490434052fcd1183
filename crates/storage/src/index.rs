//! Per-collection index registry
//!
//! Indexes here are logical: they record the key specification and enforce
//! uniqueness, they do not accelerate lookups. Every collection starts with
//! the unique `_id_` index, which `drop_all` keeps.

use docmap_core::{IndexOptions, IndexSpec, Value, ID_FIELD};
use std::collections::BTreeMap;

use crate::collection::StoredDocument;
use crate::matcher::lookup;

/// Name of the implicit primary key index
pub const ID_INDEX: &str = "_id_";

#[derive(Debug, Clone)]
struct IndexEntry {
    spec: IndexSpec,
    unique: bool,
}

/// Secondary index definitions of one collection, keyed by name
#[derive(Debug, Clone)]
pub struct IndexRegistry {
    indexes: BTreeMap<String, IndexEntry>,
}

impl IndexRegistry {
    /// Create a registry holding only the `_id_` index
    pub fn new() -> Self {
        let mut indexes = BTreeMap::new();
        indexes.insert(
            ID_INDEX.to_string(),
            IndexEntry {
                spec: IndexSpec::single(ID_FIELD),
                unique: true,
            },
        );
        Self { indexes }
    }

    /// Add the index unless one with the same name exists
    ///
    /// Returns the index name and whether it was newly created.
    pub fn ensure(&mut self, spec: &IndexSpec, options: &IndexOptions) -> (String, bool) {
        let name = spec.name();
        if self.indexes.contains_key(&name) {
            return (name, false);
        }
        self.indexes.insert(
            name.clone(),
            IndexEntry {
                spec: spec.clone(),
                unique: options.unique,
            },
        );
        (name, true)
    }

    /// Remove every index except `_id_`
    pub fn drop_all(&mut self) {
        self.indexes.retain(|name, _| name == ID_INDEX);
    }

    /// Name → key spec for every index
    pub fn information(&self) -> BTreeMap<String, IndexSpec> {
        self.indexes
            .iter()
            .map(|(name, entry)| (name.clone(), entry.spec.clone()))
            .collect()
    }

    /// Check whether an index with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    /// Get the number of indexes, `_id_` included
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    /// Always false: `_id_` cannot be dropped
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Find a unique index that `candidate` would violate
    ///
    /// `existing` yields the stored documents to check against; the document
    /// being replaced (same `_id`) must already be excluded by the caller.
    /// Returns the violated index name.
    pub fn violation<'a>(
        &self,
        candidate: &StoredDocument,
        existing: impl Iterator<Item = &'a StoredDocument> + Clone,
    ) -> Option<String> {
        for (name, entry) in self.indexes.iter().filter(|(_, e)| e.unique) {
            let key = index_key(&entry.spec, candidate);
            let clash = existing.clone().any(|other| {
                let other_key = index_key(&entry.spec, other);
                key.iter()
                    .zip(other_key.iter())
                    .all(|(a, b)| a.loosely_equals(b))
            });
            if clash {
                return Some(name.clone());
            }
        }
        None
    }
}

impl Default for IndexRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn index_key(spec: &IndexSpec, doc: &StoredDocument) -> Vec<Value> {
    spec.fields()
        .map(|field| lookup(doc.document(), field).cloned().unwrap_or(Value::Null))
        .collect()
}
