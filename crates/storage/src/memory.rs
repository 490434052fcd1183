//! MemoryDriver: in-process implementation of the Driver contract
//!
//! Collections live in an `FxHashMap` behind a single `parking_lot::RwLock`.
//! Reads take the read lock; writes take the write lock for the whole
//! operation, so each driver call is atomic with respect to the others.
//!
//! # Design Notes
//!
//! - **Implicit collections**: the first insert or `ensure_index` creates a
//!   collection; reads against an absent collection see an empty one
//! - **Natural order**: insertion order, stable across updates
//! - **Logical indexes**: indexes record key specs and enforce uniqueness only

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use docmap_core::{
    Document, Driver, DriverError, DriverResult, IndexOptions, IndexSpec, NativeQuery, ObjectId,
};

use crate::collection::Collection;
use crate::index::IndexRegistry;

/// In-memory document store
///
/// Cloning a `MemoryDriver` yields a handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    collections: Arc<RwLock<FxHashMap<String, Collection>>>,
}

impl MemoryDriver {
    /// Create an empty driver
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of documents across all collections
    pub fn document_count(&self) -> usize {
        self.collections.read().values().map(Collection::len).sum()
    }

    fn with_collection_mut<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Collection) -> DriverResult<T>,
    ) -> DriverResult<T> {
        let mut collections = self.collections.write();
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| Collection::new(name));
        f(collection)
    }
}

impl Driver for MemoryDriver {
    fn insert(&self, collection: &str, document: Document) -> DriverResult<ObjectId> {
        let id = self.with_collection_mut(collection, |c| c.insert(document))?;
        debug!(target: "docmap::storage", collection, id = %id, "insert");
        Ok(id)
    }

    fn update(&self, collection: &str, id: &ObjectId, document: Document) -> DriverResult<()> {
        let mut collections = self.collections.write();
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| DriverError::NotFound {
                collection: collection.to_string(),
                id: id.to_hex(),
            })?;
        target.replace(id, document)?;
        debug!(target: "docmap::storage", collection, id = %id, "update");
        Ok(())
    }

    fn remove(&self, collection: &str, filter: &Document) -> DriverResult<u64> {
        let mut collections = self.collections.write();
        let removed = match collections.get_mut(collection) {
            Some(target) => target.remove(filter)?,
            None => 0,
        };
        debug!(target: "docmap::storage", collection, removed, "remove");
        Ok(removed)
    }

    fn find(&self, collection: &str, query: &NativeQuery) -> DriverResult<Vec<Document>> {
        let collections = self.collections.read();
        match collections.get(collection) {
            Some(target) => target.find(query),
            None => Ok(Vec::new()),
        }
    }

    fn count(&self, collection: &str, filter: &Document) -> DriverResult<u64> {
        let collections = self.collections.read();
        match collections.get(collection) {
            Some(target) => target.count(filter),
            None => Ok(0),
        }
    }

    fn ensure_index(
        &self,
        collection: &str,
        spec: &IndexSpec,
        options: &IndexOptions,
    ) -> DriverResult<String> {
        if spec.is_empty() {
            return Err(DriverError::Backend("index spec has no keys".to_string()));
        }
        let (name, created) =
            self.with_collection_mut(collection, |c| Ok(c.ensure_index(spec, options)))?;
        if created {
            info!(
                target: "docmap::storage",
                collection,
                index = %name,
                unique = options.unique,
                "Created index"
            );
        }
        Ok(name)
    }

    fn index_information(&self, collection: &str) -> DriverResult<BTreeMap<String, IndexSpec>> {
        let collections = self.collections.read();
        Ok(match collections.get(collection) {
            Some(target) => target.indexes().information(),
            None => IndexRegistry::new().information(),
        })
    }

    fn drop_indexes(&self, collection: &str) -> DriverResult<()> {
        let mut collections = self.collections.write();
        if let Some(target) = collections.get_mut(collection) {
            target.drop_indexes();
        }
        Ok(())
    }

    fn drop_collection(&self, collection: &str) -> DriverResult<()> {
        if self.collections.write().remove(collection).is_some() {
            info!(target: "docmap::storage", collection, "Dropped collection");
        }
        Ok(())
    }

    fn collection_names(&self) -> DriverResult<Vec<String>> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
