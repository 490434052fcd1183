//! Record: one mapped document
//!
//! ## Lifecycle
//!
//! ```text
//!   new ──save──▶ persisted ──destroy──▶ destroyed
//!    │                │  ▲
//!    │                └──┘ save (update, refresh updated_at)
//!    └──────────destroy──────────────────▶ destroyed
//! ```
//!
//! - `_id` is absent until the first save and never changes afterwards
//! - `created_at` is set once, on insert; `updated_at` on every save and
//!   strictly increasing for one record
//! - a destroyed record is read-only: `set` and `save` fail with
//!   `InvalidOperation`
//!
//! Attribute writes are coerced through the model's key definitions.
//! Writing an undeclared key is allowed (documents are schemaless) but
//! logged at warn level.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use docmap_core::{
    normalize_key, Document, Error, ObjectId, Result, Timestamp, Value, ID_FIELD,
};
use tracing::{debug, warn};

use crate::association::ManyProxy;
use crate::attributes::AttributeStore;
use crate::catalog::ModelDef;
use crate::database::Database;
use crate::embedded::EmbeddedRecord;
use crate::schema::{KeyType, CREATED_AT, TYPE_KEY, UPDATED_AT};

/// Where a record is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Built in memory, never inserted
    New,
    /// Backed by a stored document
    Persisted,
    /// Removed from storage; read-only
    Destroyed,
}

fn canonical(key: &str) -> &str {
    match normalize_key(key) {
        "id" => ID_FIELD,
        other => other,
    }
}

/// A mapped record of some model
#[derive(Clone)]
pub struct Record {
    db: Database,
    def: Arc<ModelDef>,
    attributes: AttributeStore,
    state: RecordState,
    /// Loaded association targets, by association name
    pub(crate) associations: HashMap<String, Vec<Record>>,
}

impl Record {
    /// Build an unsaved record
    ///
    /// Every declared key starts at its default (or zero value); members of
    /// a polymorphic family carry their own type name in `_type`. Invalid
    /// values in `attrs` are dropped with a warning.
    pub(crate) fn new(db: Database, def: Arc<ModelDef>, attrs: Document) -> Self {
        let mut attributes = AttributeStore::new();
        for key in def.keys() {
            attributes.insert(key.name(), key.initial_value());
        }
        if def.is_polymorphic() {
            attributes.insert(TYPE_KEY, Value::from(def.name()));
        }
        let mut record = Self {
            db,
            def,
            attributes,
            state: RecordState::New,
            associations: HashMap::new(),
        };
        for (key, value) in attrs {
            if let Err(e) = record.write(&key, value) {
                warn!(target: "docmap::record", model = record.model_name(), key = %key, error = %e, "Dropped attribute");
            }
        }
        record
    }

    /// Materialize a stored document
    pub(crate) fn hydrate(db: Database, def: Arc<ModelDef>, document: Document) -> Self {
        let attributes = Self::coerce_stored(&def, document);
        Self {
            db,
            def,
            attributes,
            state: RecordState::Persisted,
            associations: HashMap::new(),
        }
    }

    fn coerce_stored(def: &ModelDef, document: Document) -> AttributeStore {
        let mut attributes = AttributeStore::from_document(document);
        for key in def.keys() {
            let value = attributes.remove(key.name()).unwrap_or(Value::Null);
            attributes.insert(key.name(), key.coerce(value));
        }
        attributes
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Read an attribute; `id` reads `_id`. Unset keys read as Null.
    pub fn get(&self, key: &str) -> &Value {
        self.attributes.get(canonical(key))
    }

    /// Write an attribute, coercing it to the declared type
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if the record is destroyed, or if the write
    ///   would change the id of a persisted record
    /// - `IllegalId` if `id` is given something that is not an id
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        if self.state == RecordState::Destroyed {
            return Err(Error::InvalidOperation(format!(
                "can't modify {} of destroyed {}",
                normalize_key(key),
                self.model_name()
            )));
        }
        self.write(key, value.into())
    }

    /// Write several attributes
    pub fn assign(&mut self, attrs: Document) -> Result<()> {
        for (key, value) in attrs {
            self.set(&key, value)?;
        }
        Ok(())
    }

    fn write(&mut self, key: &str, value: Value) -> Result<()> {
        let key = canonical(key);
        if key == ID_FIELD {
            let id = if value.is_null() {
                Value::Null
            } else {
                Value::ObjectId(ObjectId::try_from(&value)?)
            };
            if self.state == RecordState::Persisted && self.get(ID_FIELD) != &id {
                return Err(Error::InvalidOperation(format!(
                    "can't change the id of persisted {}",
                    self.model_name()
                )));
            }
            self.attributes.insert(ID_FIELD, id);
            return Ok(());
        }
        if self.def.key(key).is_none() {
            warn!(
                target: "docmap::record",
                model = self.model_name(),
                key,
                "Writing undeclared key"
            );
        }
        let value = self.def.coerce(key, value);
        self.attributes.insert(key, value);
        Ok(())
    }

    /// Embedded record stored under `key`, if the key is an embedded type
    pub fn embedded(&self, key: &str) -> Option<EmbeddedRecord> {
        let def = self.def.key(key)?;
        let KeyType::Embedded(schema) = def.key_type() else {
            return None;
        };
        let document = self.get(key).as_document()?.clone();
        Some(EmbeddedRecord::new(Arc::clone(schema), document))
    }

    /// All attributes
    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    /// Attributes as a document (what `save` writes)
    pub fn to_document(&self) -> Document {
        self.attributes.to_document()
    }

    // =========================================================================
    // Identity & state
    // =========================================================================

    /// Concrete type name
    pub fn model_name(&self) -> &str {
        self.def.name()
    }

    /// Collection the record lives in
    pub fn collection_name(&self) -> &str {
        self.def.collection()
    }

    /// Resolved definition of the concrete type
    pub fn def(&self) -> &Arc<ModelDef> {
        &self.def
    }

    /// Assigned id, `None` until first saved
    pub fn id(&self) -> Option<ObjectId> {
        self.get(ID_FIELD).as_object_id()
    }

    /// Current lifecycle state
    pub fn state(&self) -> RecordState {
        self.state
    }

    /// Never saved
    pub fn is_new(&self) -> bool {
        self.state == RecordState::New
    }

    /// Backed by a stored document
    pub fn is_persisted(&self) -> bool {
        self.state == RecordState::Persisted
    }

    /// Destroyed and read-only
    pub fn is_destroyed(&self) -> bool {
        self.state == RecordState::Destroyed
    }

    /// Time of first save
    pub fn created_at(&self) -> Option<Timestamp> {
        self.get(CREATED_AT).as_timestamp()
    }

    /// Time of last save
    pub fn updated_at(&self) -> Option<Timestamp> {
        self.get(UPDATED_AT).as_timestamp()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Insert (new) or update (persisted) the record
    ///
    /// # Errors
    ///
    /// `InvalidOperation` for a destroyed record; driver errors propagate.
    pub fn save(&mut self) -> Result<()> {
        match self.state {
            RecordState::New => self.insert(),
            RecordState::Persisted => self.update(),
            RecordState::Destroyed => Err(Error::InvalidOperation(format!(
                "can't save destroyed {}",
                self.model_name()
            ))),
        }
    }

    fn insert(&mut self) -> Result<()> {
        if self.db.config().timestamps {
            let now = Timestamp::now();
            if self.created_at().is_none() {
                self.attributes.insert(CREATED_AT, Value::Timestamp(now));
            }
            self.attributes.insert(UPDATED_AT, Value::Timestamp(now));
        }
        let mut document = self.attributes.to_document();
        if document.get(ID_FIELD).map_or(false, Value::is_null) {
            document.remove(ID_FIELD);
        }
        let id = self.db.driver().insert(self.collection_name(), document)?;
        self.attributes.insert(ID_FIELD, Value::ObjectId(id));
        self.state = RecordState::Persisted;
        debug!(target: "docmap::record", model = self.model_name(), id = %id, "Inserted");
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        let id = self.require_id()?;
        if self.db.config().timestamps {
            let now = Timestamp::now();
            let stamp = match self.updated_at() {
                Some(previous) if !now.is_after(previous) => previous.next_tick(),
                _ => now,
            };
            self.attributes.insert(UPDATED_AT, Value::Timestamp(stamp));
        }
        self.db
            .driver()
            .update(self.collection_name(), &id, self.attributes.to_document())?;
        debug!(target: "docmap::record", model = self.model_name(), id = %id, "Updated");
        Ok(())
    }

    fn require_id(&self) -> Result<ObjectId> {
        self.id().ok_or_else(|| {
            Error::InvalidOperation(format!("{} has not been saved", self.model_name()))
        })
    }

    /// Assign attributes and save
    pub fn update_attributes(&mut self, attrs: Document) -> Result<()> {
        self.assign(attrs)?;
        self.save()
    }

    /// Remove the stored document and freeze the record
    ///
    /// Destroying a new record only freezes it; destroying twice is a no-op.
    pub fn destroy(&mut self) -> Result<()> {
        match self.state {
            RecordState::Destroyed => return Ok(()),
            RecordState::New => {}
            RecordState::Persisted => {
                let id = self.require_id()?;
                let mut filter = Document::new();
                filter.insert(ID_FIELD.to_string(), Value::ObjectId(id));
                self.db.driver().remove(self.collection_name(), &filter)?;
                debug!(target: "docmap::record", model = self.model_name(), id = %id, "Destroyed");
            }
        }
        self.state = RecordState::Destroyed;
        Ok(())
    }

    /// Re-read attributes from storage, dropping cached associations
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` for a record that was never saved
    /// - `DocumentNotFound` when the stored document is gone
    pub fn reload(&mut self) -> Result<()> {
        let id = self.require_id()?;
        let mut filter = Document::new();
        filter.insert(ID_FIELD.to_string(), Value::ObjectId(id));
        let document = self
            .db
            .driver()
            .find_one(self.collection_name(), &filter)?
            .ok_or_else(|| Error::document_not_found(self.collection_name(), [id]))?;
        self.attributes = Self::coerce_stored(&self.def, document);
        self.associations.clear();
        Ok(())
    }

    // =========================================================================
    // Associations
    // =========================================================================

    /// Proxy over the records of a declared `has_many` association
    ///
    /// # Errors
    ///
    /// `UnknownAssociation` when the type declares no such association.
    pub fn association(&mut self, name: &str) -> Result<ManyProxy<'_>> {
        let assoc = self.def.association(name)?.clone();
        let target = self.db.model(&assoc.target)?;
        Ok(ManyProxy::new(self, assoc, target))
    }
}

impl PartialEq for Record {
    /// Same collection and same persisted id; unsaved records equal nothing
    fn eq(&self, other: &Self) -> bool {
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b && self.collection_name() == other.collection_name(),
            _ => false,
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.model_name())
            .field("state", &self.state)
            .field("attributes", self.attributes.as_document())
            .finish()
    }
}
