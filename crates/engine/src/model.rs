//! Model: class-level operations of one record type
//!
//! Everything that does not start from a loaded record lives here:
//! creation, id and criteria finders, counting, pagination, bulk update,
//! delete/destroy and index management.
//!
//! ## Finder contract
//!
//! - `find(id)` returns exactly one record or `DocumentNotFound`
//! - `find_many(ids)` returns every record in driver order, or
//!   `DocumentNotFound` when any id is missing (no partial results)
//! - malformed ids fail with `IllegalId` before storage is touched
//! - `find_by_id` is `find` with absence mapped to `None`
//!
//! Subtype models only see documents of their own `_type`. The association
//! proxy reuses the `*_in` variants with the foreign key added to the scope.

use std::collections::BTreeMap;
use std::sync::Arc;

use docmap_core::{
    Document, Driver, Error, IndexOptions, IndexSpec, NativeQuery, ObjectId, Result, Value,
    ID_FIELD,
};
use tracing::debug;

use crate::catalog::ModelDef;
use crate::database::Database;
use crate::pagination::{Page, PaginateOptions, Pagination};
use crate::query::{FindOptions, QueryTranslator, Selector};
use crate::record::Record;

/// Result of a selector-based find
#[derive(Debug, Clone, PartialEq)]
pub enum Found {
    /// `Selector::All`
    Many(Vec<Record>),
    /// `Selector::First` / `Selector::Last`
    One(Option<Record>),
}

impl Found {
    /// Records as a list (zero or one element for `One`)
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Found::Many(records) => records,
            Found::One(record) => record.into_iter().collect(),
        }
    }

    /// Single record (the first one for `Many`)
    pub fn into_record(self) -> Option<Record> {
        match self {
            Found::Many(records) => records.into_iter().next(),
            Found::One(record) => record,
        }
    }
}

/// Parse an id argument
pub(crate) fn to_object_id(id: &Value) -> Result<ObjectId> {
    ObjectId::try_from(id)
}

fn merge(mut base: Document, scope: &Document) -> Document {
    for (field, value) in scope {
        base.insert(field.clone(), value.clone());
    }
    base
}

fn id_in(ids: &[ObjectId]) -> Value {
    let mut op = Document::new();
    op.insert(
        "$in".to_string(),
        Value::Array(ids.iter().copied().map(Value::ObjectId).collect()),
    );
    Value::Object(op)
}

/// Class-level handle for one record type
#[derive(Debug, Clone)]
pub struct Model {
    db: Database,
    def: Arc<ModelDef>,
}

impl Model {
    pub(crate) fn new(db: Database, def: Arc<ModelDef>) -> Self {
        Self { db, def }
    }

    /// Type name
    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// Collection the family is stored in
    pub fn collection_name(&self) -> &str {
        self.def.collection()
    }

    /// Resolved definition
    pub fn def(&self) -> &Arc<ModelDef> {
        &self.def
    }

    /// Names of all declared keys, including `_type` and timestamps
    pub fn key_names(&self) -> Vec<&str> {
        self.def.key_names()
    }

    /// The owning database
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn driver(&self) -> &dyn Driver {
        self.db.driver()
    }

    fn translator(&self) -> QueryTranslator<'_> {
        QueryTranslator::new(&self.def, self.db.config())
    }

    /// Conditions restricting queries to this type
    pub(crate) fn base_scope(&self) -> Document {
        self.translator().base_scope()
    }

    fn hydrate(&self, document: Document) -> Record {
        let def = self.db.catalog().resolve(&self.def, &document);
        Record::hydrate(self.db.clone(), def, document)
    }

    fn not_found(&self, ids: &[Value]) -> Error {
        Error::document_not_found(
            self.collection_name(),
            ids.iter().map(|id| match id {
                Value::ObjectId(oid) => oid.to_hex(),
                other => other.to_string(),
            }),
        )
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Build an unsaved record with coerced attributes
    pub fn new_record(&self, attrs: Document) -> Record {
        Record::new(self.db.clone(), Arc::clone(&self.def), attrs)
    }

    /// Build and insert a record
    pub fn create(&self, attrs: Document) -> Result<Record> {
        let mut record = self.new_record(attrs);
        record.save()?;
        Ok(record)
    }

    /// Create one record per attribute mapping, in input order
    pub fn create_many(&self, attrs: Vec<Document>) -> Result<Vec<Record>> {
        attrs.into_iter().map(|a| self.create(a)).collect()
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Update one record's attributes by id
    ///
    /// Only the given attributes change. Returns the updated record.
    ///
    /// # Errors
    ///
    /// - `InvalidArguments` if `attrs` is not a mapping
    /// - `IllegalId` / `DocumentNotFound` as for [`Model::find`]
    pub fn update(&self, id: impl Into<Value>, attrs: impl Into<Value>) -> Result<Record> {
        let attrs = match attrs.into() {
            Value::Object(attrs) => attrs,
            other => {
                return Err(Error::InvalidArguments(format!(
                    "update expects an id and a mapping of attributes, got {}",
                    other.type_name()
                )))
            }
        };
        let mut record = self.find(id)?;
        record.update_attributes(attrs)?;
        Ok(record)
    }

    /// Update several records from an id → attributes mapping
    ///
    /// # Errors
    ///
    /// - `InvalidArguments` if `updates` is not a mapping of mappings
    /// - `IllegalId` / `DocumentNotFound` for bad or missing ids
    pub fn update_many(&self, updates: impl Into<Value>) -> Result<Vec<Record>> {
        let updates = match updates.into() {
            Value::Object(updates) => updates,
            other => {
                return Err(Error::InvalidArguments(format!(
                    "update with many records expects a mapping of id to attributes, got {}",
                    other.type_name()
                )))
            }
        };
        // Validate the whole shape before writing anything
        let mut planned = Vec::with_capacity(updates.len());
        for (id, attrs) in updates {
            let id = ObjectId::parse(&id)?;
            match attrs {
                Value::Object(attrs) => planned.push((id, attrs)),
                other => {
                    return Err(Error::InvalidArguments(format!(
                        "attributes for {} must be a mapping, got {}",
                        id,
                        other.type_name()
                    )))
                }
            }
        }
        planned
            .into_iter()
            .map(|(id, attrs)| self.update(id, attrs))
            .collect()
    }

    // =========================================================================
    // Finders
    // =========================================================================

    /// Find one record by id
    pub fn find(&self, id: impl Into<Value>) -> Result<Record> {
        self.find_in(&self.base_scope(), id.into())
    }

    /// Find several records by id; all must exist
    ///
    /// The ids are treated as a set: repeated ids yield one record each.
    pub fn find_many<I, V>(&self, ids: I) -> Result<Vec<Record>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.find_many_in(&self.base_scope(), ids.into_iter().map(Into::into).collect())
    }

    /// Find one record by id, `None` when absent
    pub fn find_by_id(&self, id: impl Into<Value>) -> Result<Option<Record>> {
        match self.find(id) {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_document_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Find with a selector; `All`, `First` and `Last` mirror
    /// [`Model::all`], [`Model::first`] and [`Model::last`]
    pub fn find_with(&self, selector: Selector, options: FindOptions) -> Result<Found> {
        self.select_in(&self.base_scope(), selector, &options)
    }

    /// All matching records
    pub fn all(&self, options: FindOptions) -> Result<Vec<Record>> {
        Ok(self.find_with(Selector::All, options)?.into_records())
    }

    /// First matching record in the requested (or default) order
    pub fn first(&self, options: FindOptions) -> Result<Option<Record>> {
        Ok(self.find_with(Selector::First, options)?.into_record())
    }

    /// Last matching record in the requested (or default, else natural) order
    pub fn last(&self, options: FindOptions) -> Result<Option<Record>> {
        Ok(self.find_with(Selector::Last, options)?.into_record())
    }

    /// Count matching records; 0 for an absent collection
    pub fn count(&self, conditions: Document) -> Result<u64> {
        self.count_in(&self.base_scope(), &conditions)
    }

    /// One page of matching records plus totals
    pub fn paginate(&self, options: PaginateOptions) -> Result<Page<Record>> {
        self.paginate_in(&self.base_scope(), &options)
    }

    pub(crate) fn find_in(&self, scope: &Document, id: Value) -> Result<Record> {
        let oid = to_object_id(&id)?;
        let mut filter = scope.clone();
        filter.insert(ID_FIELD.to_string(), Value::ObjectId(oid));
        match self.driver().find_one(self.collection_name(), &filter)? {
            Some(document) => Ok(self.hydrate(document)),
            None => Err(self.not_found(&[Value::ObjectId(oid)])),
        }
    }

    pub(crate) fn find_many_in(&self, scope: &Document, ids: Vec<Value>) -> Result<Vec<Record>> {
        if ids.is_empty() {
            return Err(self.not_found(&[]));
        }
        let mut wanted: Vec<ObjectId> = Vec::with_capacity(ids.len());
        for id in &ids {
            let oid = to_object_id(id)?;
            if !wanted.contains(&oid) {
                wanted.push(oid);
            }
        }
        let mut filter = scope.clone();
        filter.insert(ID_FIELD.to_string(), id_in(&wanted));
        let found = self
            .driver()
            .find(self.collection_name(), &NativeQuery::new(filter))?;
        if found.len() != wanted.len() {
            let requested: Vec<Value> = wanted.into_iter().map(Value::ObjectId).collect();
            return Err(self.not_found(&requested));
        }
        Ok(found.into_iter().map(|d| self.hydrate(d)).collect())
    }

    pub(crate) fn select_in(
        &self,
        scope: &Document,
        selector: Selector,
        options: &FindOptions,
    ) -> Result<Found> {
        let translator = self.translator();
        let mut query = translator.translate(scope, options)?;
        match selector {
            Selector::All => {}
            Selector::First => query.limit = Some(1),
            Selector::Last => {
                query.sort = translator.reversed_sort(options.order.as_deref())?;
                query.limit = Some(1);
            }
        }
        let documents = self.driver().find(self.collection_name(), &query)?;
        let records: Vec<Record> = documents.into_iter().map(|d| self.hydrate(d)).collect();
        Ok(match selector {
            Selector::All => Found::Many(records),
            Selector::First | Selector::Last => Found::One(records.into_iter().next()),
        })
    }

    pub(crate) fn count_in(&self, scope: &Document, conditions: &Document) -> Result<u64> {
        let filter = merge(self.translator().filter(conditions), scope);
        Ok(self.driver().count(self.collection_name(), &filter)?)
    }

    pub(crate) fn paginate_in(&self, scope: &Document, options: &PaginateOptions) -> Result<Page<Record>> {
        let per_page = options.per_page.unwrap_or(self.db.config().default_per_page);
        let pagination = Pagination::new(per_page, options.page)?;
        let total = self.count_in(scope, &options.conditions)?;
        let items = self
            .select_in(scope, Selector::All, &pagination.window(options))?
            .into_records();
        Ok(Page::new(items, total, pagination))
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Remove one document by id, bypassing record hooks
    pub fn delete(&self, id: impl Into<Value>) -> Result<u64> {
        self.delete_many([id.into()])
    }

    /// Remove documents by id, bypassing record hooks; missing ids are ignored
    pub fn delete_many<I, V>(&self, ids: I) -> Result<u64>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let ids = ids
            .into_iter()
            .map(|id| to_object_id(&id.into()))
            .collect::<Result<Vec<_>>>()?;
        let mut filter = self.base_scope();
        filter.insert(ID_FIELD.to_string(), id_in(&ids));
        self.remove(filter)
    }

    /// Remove every matching document, bypassing record hooks
    pub fn delete_all(&self, conditions: Document) -> Result<u64> {
        let filter = merge(self.translator().filter(&conditions), &self.base_scope());
        self.remove(filter)
    }

    fn remove(&self, filter: Document) -> Result<u64> {
        let removed = self.driver().remove(self.collection_name(), &filter)?;
        debug!(
            target: "docmap::model",
            model = self.name(),
            removed,
            "Deleted documents"
        );
        Ok(removed)
    }

    /// Load and destroy one record by id; a missing id is not an error
    pub fn destroy(&self, id: impl Into<Value>) -> Result<u64> {
        self.destroy_many([id.into()])
    }

    /// Load and destroy records by id; missing ids are ignored
    pub fn destroy_many<I, V>(&self, ids: I) -> Result<u64>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let ids = ids
            .into_iter()
            .map(|id| to_object_id(&id.into()))
            .collect::<Result<Vec<_>>>()?;
        let mut conditions = Document::new();
        conditions.insert(ID_FIELD.to_string(), id_in(&ids));
        self.destroy_records(self.all(FindOptions::new().conditions(conditions))?)
    }

    /// Load and destroy every matching record
    pub fn destroy_all(&self, conditions: Document) -> Result<u64> {
        self.destroy_records(self.all(FindOptions::new().conditions(conditions))?)
    }

    fn destroy_records(&self, records: Vec<Record>) -> Result<u64> {
        let mut destroyed = 0;
        for mut record in records {
            record.destroy()?;
            destroyed += 1;
        }
        Ok(destroyed)
    }

    // =========================================================================
    // Indexes
    // =========================================================================

    /// Create an index unless it exists; returns its name
    ///
    /// A field name makes an ascending single-key index; use
    /// [`IndexSpec::compound`] for several keys. Options go to the driver
    /// unchanged.
    pub fn ensure_index(&self, spec: impl Into<IndexSpec>, options: IndexOptions) -> Result<String> {
        let spec = spec.into();
        if spec.is_empty() {
            return Err(Error::InvalidArguments("index needs at least one key".to_string()));
        }
        let name = self.driver().ensure_index(self.collection_name(), &spec, &options)?;
        debug!(
            target: "docmap::model",
            model = self.name(),
            index = %name,
            unique = options.unique,
            "Ensured index"
        );
        Ok(name)
    }

    /// All indexes of the collection, keyed by name
    pub fn index_information(&self) -> Result<BTreeMap<String, IndexSpec>> {
        Ok(self.driver().index_information(self.collection_name())?)
    }

    /// Drop every index except the primary key index
    pub fn drop_indexes(&self) -> Result<()> {
        Ok(self.driver().drop_indexes(self.collection_name())?)
    }

    /// Drop the whole collection (shared by the family)
    pub fn drop_collection(&self) -> Result<()> {
        Ok(self.driver().drop_collection(self.collection_name())?)
    }
}
