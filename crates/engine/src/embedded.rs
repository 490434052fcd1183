//! Embedded records
//!
//! An embedded record has a schema but no collection or id of its own; it
//! is stored as a nested document inside its owner and saved with it.

use std::sync::Arc;

use docmap_core::{normalize_key, Document, Value};

use crate::attributes::AttributeStore;
use crate::schema::coerce::coerce_embedded;
use crate::schema::Schema;

/// A typed view over a nested document
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedRecord {
    schema: Arc<Schema>,
    attributes: AttributeStore,
}

impl EmbeddedRecord {
    /// Build from attributes, coercing declared keys
    pub fn new(schema: Arc<Schema>, attrs: Document) -> Self {
        let attributes = AttributeStore::from_document(coerce_embedded(&schema, attrs));
        Self { schema, attributes }
    }

    /// Embedded type name
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// The embedded schema
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Read an attribute
    pub fn get(&self, key: &str) -> &Value {
        self.attributes.get(key)
    }

    /// Write an attribute, coercing declared keys
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let key = normalize_key(key);
        let value = match self.schema.key_named(key) {
            Some(def) => def.coerce(value.into()),
            None => value.into().normalized(),
        };
        self.attributes.insert(key, value);
    }

    /// The nested document
    pub fn to_document(&self) -> Document {
        self.attributes.to_document()
    }
}

impl From<EmbeddedRecord> for Value {
    fn from(record: EmbeddedRecord) -> Self {
        Value::Object(record.to_document())
    }
}
