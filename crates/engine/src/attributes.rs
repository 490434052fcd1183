//! Attribute store backing every record
//!
//! A thin map of canonical key → coerced value. Keys are normalized on every
//! access so `":name"` and `"name"` address the same attribute. Coercion is
//! the caller's job (it needs the schema); the store only holds values.

use docmap_core::{normalize_key, Document, Value};

static NULL: Value = Value::Null;

/// Mutable attribute values of one record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeStore {
    values: Document,
}

impl AttributeStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing document, normalizing its keys
    pub fn from_document(document: Document) -> Self {
        Self {
            values: docmap_core::normalize_document(document),
        }
    }

    /// Value of `key`, or Null when unset
    pub fn get(&self, key: &str) -> &Value {
        self.values.get(normalize_key(key)).unwrap_or(&NULL)
    }

    /// Check if `key` holds a value (Null counts as set)
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(normalize_key(key))
    }

    /// Store an already coerced value, returning the previous one
    pub fn insert(&mut self, key: &str, value: Value) -> Option<Value> {
        self.values.insert(normalize_key(key).to_string(), value)
    }

    /// Remove `key`, returning its value
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(normalize_key(key))
    }

    /// Iterate over `(key, value)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of stored attributes
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no attributes are stored
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrow the underlying document
    pub fn as_document(&self) -> &Document {
        &self.values
    }

    /// Copy out the underlying document
    pub fn to_document(&self) -> Document {
        self.values.clone()
    }
}
