//! A single named collection
//!
//! Documents are kept in a `Vec` in natural (insertion) order. Each stored
//! document carries a sequence number assigned at insert; replacing a
//! document keeps its sequence so natural order is stable across updates.

use docmap_core::{
    Document, DriverError, DriverResult, IndexOptions, IndexSpec, NativeQuery, ObjectId, Value,
    ID_FIELD,
};

use crate::index::IndexRegistry;
use crate::matcher::matches;
use crate::ordering::sort_documents;

/// A document plus its natural-order sequence number
#[derive(Debug, Clone)]
pub struct StoredDocument {
    seq: u64,
    doc: Document,
}

impl StoredDocument {
    /// Wrap a document with its sequence number
    pub fn new(seq: u64, doc: Document) -> Self {
        Self { seq, doc }
    }

    /// Natural-order position
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The stored document
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// The `_id` of the stored document, if it is an ObjectId
    pub fn id(&self) -> Option<ObjectId> {
        self.doc.get(ID_FIELD).and_then(Value::as_object_id)
    }
}

/// Documents and indexes of one collection
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    documents: Vec<StoredDocument>,
    next_seq: u64,
    indexes: IndexRegistry,
}

impl Collection {
    /// Create an empty collection with only the `_id_` index
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: Vec::new(),
            next_seq: 0,
            indexes: IndexRegistry::new(),
        }
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if the collection holds no documents
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Append a document, generating `_id` when absent
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` when a unique index (including `_id_`) rejects
    /// the document, or `Backend` when `_id` is not an ObjectId.
    pub fn insert(&mut self, mut doc: Document) -> DriverResult<ObjectId> {
        let id = match doc.get(ID_FIELD) {
            None | Some(Value::Null) => {
                let id = ObjectId::new();
                doc.insert(ID_FIELD.to_string(), Value::ObjectId(id));
                id
            }
            Some(other) => other.as_object_id().ok_or_else(|| {
                DriverError::Backend(format!("_id must be an ObjectId, got {}", other))
            })?,
        };

        let candidate = StoredDocument::new(self.next_seq, doc);
        self.check_unique(&candidate, None)?;
        self.next_seq += 1;
        self.documents.push(candidate);
        Ok(id)
    }

    /// Replace the document with this id, keeping its natural position
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no document has this id, or `DuplicateKey` if
    /// the replacement violates a unique index.
    pub fn replace(&mut self, id: &ObjectId, mut doc: Document) -> DriverResult<()> {
        let position = self
            .documents
            .iter()
            .position(|stored| stored.id().as_ref() == Some(id))
            .ok_or_else(|| DriverError::NotFound {
                collection: self.name.clone(),
                id: id.to_hex(),
            })?;

        doc.insert(ID_FIELD.to_string(), Value::ObjectId(*id));
        let candidate = StoredDocument::new(self.documents[position].seq, doc);
        self.check_unique(&candidate, Some(position))?;
        self.documents[position] = candidate;
        Ok(())
    }

    /// Remove every document matching the filter
    pub fn remove(&mut self, filter: &Document) -> DriverResult<u64> {
        // Evaluate first so a bad operator leaves the collection untouched
        let keep = self
            .documents
            .iter()
            .map(|stored| matches(stored.document(), filter).map(|hit| !hit))
            .collect::<DriverResult<Vec<bool>>>()?;

        let before = self.documents.len();
        let mut flags = keep.into_iter();
        self.documents.retain(|_| flags.next().unwrap_or(true));
        Ok((before - self.documents.len()) as u64)
    }

    fn check_unique(&self, candidate: &StoredDocument, replacing: Option<usize>) -> DriverResult<()> {
        let others = self
            .documents
            .iter()
            .enumerate()
            .filter(move |(i, _)| Some(*i) != replacing)
            .map(|(_, stored)| stored);
        match self.indexes.violation(candidate, others) {
            Some(index) => Err(DriverError::DuplicateKey {
                collection: self.name.clone(),
                index,
            }),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Run a query: filter, sort, then skip and limit
    pub fn find(&self, query: &NativeQuery) -> DriverResult<Vec<Document>> {
        let mut hits = Vec::new();
        for stored in &self.documents {
            if matches(stored.document(), &query.filter)? {
                hits.push(stored);
            }
        }
        if !query.sort.is_empty() {
            sort_documents(&mut hits, &query.sort);
        }
        Ok(hits
            .into_iter()
            .skip(query.skip.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|stored| stored.document().clone())
            .collect())
    }

    /// Count documents matching the filter
    pub fn count(&self, filter: &Document) -> DriverResult<u64> {
        let mut total = 0u64;
        for stored in &self.documents {
            if matches(stored.document(), filter)? {
                total += 1;
            }
        }
        Ok(total)
    }

    // =========================================================================
    // Indexes
    // =========================================================================

    /// Index registry of this collection
    pub fn indexes(&self) -> &IndexRegistry {
        &self.indexes
    }

    /// Create the index if absent; returns its name and whether it is new
    pub fn ensure_index(&mut self, spec: &IndexSpec, options: &IndexOptions) -> (String, bool) {
        self.indexes.ensure(spec, options)
    }

    /// Drop every index except `_id_`
    pub fn drop_indexes(&mut self) {
        self.indexes.drop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmap_core::{doc, SortKey};

    fn users() -> Collection {
        let mut users = Collection::new("users");
        users.insert(doc! { "first_name" => "John", "age" => 27 }).unwrap();
        users.insert(doc! { "first_name" => "Steve", "age" => 30 }).unwrap();
        users.insert(doc! { "first_name" => "Steph", "age" => 29 }).unwrap();
        users
    }

    fn first_names(docs: &[Document]) -> Vec<&str> {
        docs.iter()
            .map(|d| d.get("first_name").and_then(Value::as_str).unwrap())
            .collect()
    }

    #[test]
    fn test_insert_generates_id() {
        let mut users = Collection::new("users");
        let id = users.insert(doc! { "first_name" => "John" }).unwrap();
        let found = users.find(&NativeQuery::default()).unwrap();
        assert_eq!(found[0].get(ID_FIELD), Some(&Value::ObjectId(id)));
    }

    #[test]
    fn test_insert_keeps_supplied_id() {
        let mut users = Collection::new("users");
        let id = ObjectId::new();
        assert_eq!(users.insert(doc! { "_id" => id }).unwrap(), id);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut users = Collection::new("users");
        let id = ObjectId::new();
        users.insert(doc! { "_id" => id }).unwrap();
        let err = users.insert(doc! { "_id" => id }).unwrap_err();
        assert!(matches!(err, DriverError::DuplicateKey { ref index, .. } if index == "_id_"));
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn test_non_object_id_rejected() {
        let mut users = Collection::new("users");
        assert!(matches!(
            users.insert(doc! { "_id" => 1 }),
            Err(DriverError::Backend(_))
        ));
    }

    #[test]
    fn test_replace_keeps_natural_position() {
        let mut users = users();
        let all = users.find(&NativeQuery::default()).unwrap();
        let john = all[0].get(ID_FIELD).and_then(Value::as_object_id).unwrap();

        users.replace(&john, doc! { "first_name" => "Johnny" }).unwrap();
        let all = users.find(&NativeQuery::default()).unwrap();
        assert_eq!(first_names(&all), vec!["Johnny", "Steve", "Steph"]);
        assert_eq!(all[0].get(ID_FIELD), Some(&Value::ObjectId(john)));
    }

    #[test]
    fn test_replace_missing_is_not_found() {
        let mut users = users();
        let err = users.replace(&ObjectId::new(), Document::new()).unwrap_err();
        assert!(matches!(err, DriverError::NotFound { .. }));
    }

    #[test]
    fn test_replace_may_keep_own_unique_value() {
        let mut users = Collection::new("users");
        users.ensure_index(&IndexSpec::single("email"), &IndexOptions::unique());
        let id = users.insert(doc! { "email" => "a@x" }).unwrap();
        users.insert(doc! { "email" => "b@x" }).unwrap();

        users.replace(&id, doc! { "email" => "a@x", "name" => "A" }).unwrap();
        let err = users.replace(&id, doc! { "email" => "b@x" }).unwrap_err();
        assert!(matches!(err, DriverError::DuplicateKey { .. }));
    }

    #[test]
    fn test_remove_by_filter() {
        let mut users = users();
        assert_eq!(users.remove(&doc! { "first_name" => "Steve" }).unwrap(), 1);
        assert_eq!(users.len(), 2);
        assert_eq!(users.remove(&Document::new()).unwrap(), 2);
        assert!(users.is_empty());
    }

    #[test]
    fn test_find_sort_skip_limit() {
        let users = users();
        let query = NativeQuery::default()
            .with_sort(vec![SortKey::desc("age")])
            .with_skip(1)
            .with_limit(1);
        assert_eq!(first_names(&users.find(&query).unwrap()), vec!["Steph"]);
    }

    #[test]
    fn test_count_with_filter() {
        let users = users();
        assert_eq!(users.count(&Document::new()).unwrap(), 3);
        assert_eq!(users.count(&doc! { "age" => doc! { "$gte" => 29 } }).unwrap(), 2);
    }
}
