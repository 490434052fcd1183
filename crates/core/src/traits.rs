//! The storage driver contract
//!
//! This module defines the `Driver` trait: the only way the mapping engine
//! reaches storage. Connection pooling, wire protocols and retry policy all
//! live behind it.
//!
//! Thread safety: all methods must be safe to call concurrently from multiple
//! threads (requires Send + Sync). Every call is synchronous; the caller
//! blocks until the driver returns.

use std::collections::BTreeMap;

use crate::error::DriverResult;
use crate::index::{IndexOptions, IndexSpec};
use crate::object_id::ObjectId;
use crate::query::NativeQuery;
use crate::value::Document;

/// Storage abstraction over named document collections
///
/// Collections are created implicitly by the first write and are absent
/// until then; reads against an absent collection behave like reads against
/// an empty one.
pub trait Driver: Send + Sync {
    /// Insert a document, returning its id
    ///
    /// If the document carries no `_id`, the driver generates one and stores
    /// it in the `_id` field.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` if a unique index rejects the document.
    fn insert(&self, collection: &str, document: Document) -> DriverResult<ObjectId>;

    /// Replace the stored document with this id
    ///
    /// The stored document keeps its natural-order position.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no document has this id.
    fn update(&self, collection: &str, id: &ObjectId, document: Document) -> DriverResult<()>;

    /// Remove every document matching the filter, returning the count removed
    fn remove(&self, collection: &str, filter: &Document) -> DriverResult<u64>;

    /// Find documents matching the query, sorted and paginated
    fn find(&self, collection: &str, query: &NativeQuery) -> DriverResult<Vec<Document>>;

    /// Count documents matching the filter; 0 for an absent collection
    fn count(&self, collection: &str, filter: &Document) -> DriverResult<u64>;

    /// Create the index unless an identical one exists, returning its name
    fn ensure_index(
        &self,
        collection: &str,
        spec: &IndexSpec,
        options: &IndexOptions,
    ) -> DriverResult<String>;

    /// All indexes of a collection, keyed by name
    fn index_information(&self, collection: &str) -> DriverResult<BTreeMap<String, IndexSpec>>;

    /// Drop every index except the primary key index
    fn drop_indexes(&self, collection: &str) -> DriverResult<()>;

    /// Drop a collection with its documents and indexes
    fn drop_collection(&self, collection: &str) -> DriverResult<()>;

    /// Names of all existing collections
    fn collection_names(&self) -> DriverResult<Vec<String>>;

    /// Find the first document matching the filter in natural order
    fn find_one(&self, collection: &str, filter: &Document) -> DriverResult<Option<Document>> {
        let query = NativeQuery::new(filter.clone()).with_limit(1);
        Ok(self.find(collection, &query)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverError;
    use crate::query::ID_FIELD;
    use crate::value::Value;
    use std::sync::Mutex;

    /// Append-only driver that ignores filters; enough to exercise defaults
    struct ListDriver {
        docs: Mutex<Vec<Document>>,
    }

    impl Driver for ListDriver {
        fn insert(&self, _collection: &str, mut document: Document) -> DriverResult<ObjectId> {
            let id = ObjectId::new();
            document.insert(ID_FIELD.to_string(), Value::ObjectId(id));
            self.docs.lock().unwrap().push(document);
            Ok(id)
        }

        fn update(&self, collection: &str, id: &ObjectId, _document: Document) -> DriverResult<()> {
            Err(DriverError::NotFound {
                collection: collection.to_string(),
                id: id.to_hex(),
            })
        }

        fn remove(&self, _collection: &str, _filter: &Document) -> DriverResult<u64> {
            Ok(0)
        }

        fn find(&self, _collection: &str, query: &NativeQuery) -> DriverResult<Vec<Document>> {
            let docs = self.docs.lock().unwrap();
            Ok(docs
                .iter()
                .take(query.limit.unwrap_or(usize::MAX))
                .cloned()
                .collect())
        }

        fn count(&self, _collection: &str, _filter: &Document) -> DriverResult<u64> {
            Ok(self.docs.lock().unwrap().len() as u64)
        }

        fn ensure_index(&self, _c: &str, spec: &IndexSpec, _o: &IndexOptions) -> DriverResult<String> {
            Ok(spec.name())
        }

        fn index_information(&self, _c: &str) -> DriverResult<BTreeMap<String, IndexSpec>> {
            Ok(BTreeMap::new())
        }

        fn drop_indexes(&self, _c: &str) -> DriverResult<()> {
            Ok(())
        }

        fn drop_collection(&self, _c: &str) -> DriverResult<()> {
            self.docs.lock().unwrap().clear();
            Ok(())
        }

        fn collection_names(&self) -> DriverResult<Vec<String>> {
            Ok(vec!["things".to_string()])
        }
    }

    #[test]
    fn test_find_one_returns_first_document() {
        let driver = ListDriver {
            docs: Mutex::new(Vec::new()),
        };
        assert!(driver.find_one("things", &Document::new()).unwrap().is_none());

        let first = driver.insert("things", Document::new()).unwrap();
        driver.insert("things", Document::new()).unwrap();

        let found = driver.find_one("things", &Document::new()).unwrap().unwrap();
        assert_eq!(found.get(ID_FIELD), Some(&Value::ObjectId(first)));
    }

    #[test]
    fn test_driver_is_object_safe() {
        let driver: Box<dyn Driver> = Box::new(ListDriver {
            docs: Mutex::new(Vec::new()),
        });
        assert_eq!(driver.count("things", &Document::new()).unwrap(), 0);
    }
}
