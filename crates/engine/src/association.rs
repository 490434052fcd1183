//! Has-many association proxy
//!
//! `owner.association("messages")` yields a [`ManyProxy`]: an ordered,
//! lazily loaded view of the target records whose foreign key equals the
//! owner's id. The loaded list is cached on the owner record and is not
//! invalidated by writes made elsewhere; call [`ManyProxy::reload`] to
//! re-read it.
//!
//! ## Writes
//!
//! | Operation | Foreign key | `_type`            | Persisted |
//! |-----------|-------------|--------------------|-----------|
//! | `push`    | owner id    | record's own type  | yes       |
//! | `concat`  | owner id    | record's own type  | yes       |
//! | `build`   | owner id    | family root        | no        |
//! | `create`  | owner id    | family root        | yes       |
//! | `replace` | owner id    | record's own type  | yes       |
//!
//! Appending to an unsaved owner saves the owner first. `replace` detaches
//! (clears the foreign key of) records that are not in the new set.
//!
//! ## Reads
//!
//! Finders delegate to the target model with the foreign key conjoined to
//! the conditions. Records come back as their stored subtype. An unsaved
//! owner has no children, so its finders answer without touching storage.

use std::collections::HashSet;
use std::slice;

use docmap_core::{Document, Error, ObjectId, Result, Value};
use tracing::debug;

use crate::catalog::AssociationDef;
use crate::model::{to_object_id, Found, Model};
use crate::pagination::{Page, PaginateOptions, Pagination};
use crate::query::{FindOptions, Selector};
use crate::record::Record;
use crate::schema::TYPE_KEY;

/// Owner-scoped view over a has-many association
pub struct ManyProxy<'a> {
    owner: &'a mut Record,
    assoc: AssociationDef,
    target: Model,
}

impl<'a> ManyProxy<'a> {
    pub(crate) fn new(owner: &'a mut Record, assoc: AssociationDef, target: Model) -> Self {
        Self {
            owner,
            assoc,
            target,
        }
    }

    /// Association name
    pub fn name(&self) -> &str {
        &self.assoc.name
    }

    /// Foreign key field on the target documents
    pub fn foreign_key(&self) -> &str {
        &self.assoc.foreign_key
    }

    /// The target model
    pub fn target(&self) -> &Model {
        &self.target
    }

    fn scope(&self, owner_id: ObjectId) -> Document {
        let mut scope = self.target.base_scope();
        scope.insert(self.assoc.foreign_key.clone(), Value::ObjectId(owner_id));
        scope
    }

    fn not_found(&self, ids: Vec<ObjectId>) -> Error {
        Error::document_not_found(self.target.collection_name(), ids)
    }

    // =========================================================================
    // Loaded list
    // =========================================================================

    fn ensure_loaded(&mut self) -> Result<()> {
        if self.owner.associations.contains_key(&self.assoc.name) {
            return Ok(());
        }
        let records = self.all(FindOptions::new())?;
        debug!(
            target: "docmap::association",
            owner = self.owner.model_name(),
            association = %self.assoc.name,
            loaded = records.len(),
            "Loaded association"
        );
        self.owner.associations.insert(self.assoc.name.clone(), records);
        Ok(())
    }

    fn cache_mut(&mut self) -> Result<&mut Vec<Record>> {
        self.ensure_loaded()?;
        Ok(self
            .owner
            .associations
            .entry(self.assoc.name.clone())
            .or_default())
    }

    /// The associated records, loading them on first access
    pub fn load(&mut self) -> Result<&[Record]> {
        Ok(self.cache_mut()?.as_slice())
    }

    /// Number of loaded records
    pub fn len(&mut self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    /// Check if no records are associated
    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.load()?.is_empty())
    }

    /// Record at `index` in the loaded list
    pub fn get(&mut self, index: usize) -> Result<Option<&Record>> {
        Ok(self.load()?.get(index))
    }

    /// Iterate over the loaded list
    pub fn iter(&mut self) -> Result<slice::Iter<'_, Record>> {
        Ok(self.load()?.iter())
    }

    /// Copy of the loaded list
    pub fn to_vec(&mut self) -> Result<Vec<Record>> {
        Ok(self.load()?.to_vec())
    }

    /// Drop the cached list and read it again
    pub fn reload(&mut self) -> Result<()> {
        self.owner.associations.remove(&self.assoc.name);
        self.ensure_loaded()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Id of the owner, saving it first if it is new
    fn saved_owner_id(&mut self) -> Result<ObjectId> {
        if self.owner.is_destroyed() {
            return Err(Error::InvalidOperation(format!(
                "can't add {} to destroyed {}",
                self.assoc.name,
                self.owner.model_name()
            )));
        }
        if self.owner.is_new() {
            self.owner.save()?;
        }
        self.owner.id().ok_or_else(|| {
            Error::InvalidOperation(format!("{} has no id after save", self.owner.model_name()))
        })
    }

    fn check_family(&self, record: &Record) -> Result<()> {
        if record.def().root() != self.target.def().root() {
            return Err(Error::InvalidArguments(format!(
                "{} expects {} records, got {}",
                self.assoc.name,
                self.target.def().root(),
                record.model_name()
            )));
        }
        Ok(())
    }

    fn attach(&self, record: &mut Record, owner_id: ObjectId) -> Result<()> {
        record.set(&self.assoc.foreign_key, owner_id)?;
        if record.def().is_polymorphic() {
            let concrete = record.model_name().to_string();
            record.set(TYPE_KEY, concrete)?;
        }
        record.save()
    }

    /// Attach `record` to the owner, save it and append it to the list
    ///
    /// # Errors
    ///
    /// `InvalidArguments` if the record is not of the target family.
    pub fn push(&mut self, mut record: Record) -> Result<()> {
        self.check_family(&record)?;
        // An unsaved owner has no stored children: load before saving it
        self.ensure_loaded()?;
        let owner_id = self.saved_owner_id()?;
        self.attach(&mut record, owner_id)?;
        self.cache_mut()?.push(record);
        Ok(())
    }

    /// Push each record in order
    pub fn concat<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = Record>,
    {
        for record in records {
            self.push(record)?;
        }
        Ok(())
    }

    /// Build an unsaved target record pointing at the owner
    ///
    /// The foreign key is Null while the owner is unsaved.
    pub fn build(&self, attrs: Document) -> Result<Record> {
        let mut record = self.target.new_record(attrs);
        record.set(&self.assoc.foreign_key, self.owner.id())?;
        if self.target.def().is_polymorphic() {
            record.set(TYPE_KEY, self.target.def().root())?;
        }
        Ok(record)
    }

    /// Build, save and append a target record
    pub fn create(&mut self, attrs: Document) -> Result<Record> {
        self.ensure_loaded()?;
        self.saved_owner_id()?;
        let mut record = self.build(attrs)?;
        record.save()?;
        self.cache_mut()?.push(record.clone());
        Ok(record)
    }

    /// Make `records` the complete set of associated records
    ///
    /// Records currently associated but absent from `records` keep their
    /// documents and lose the foreign key.
    ///
    /// # Errors
    ///
    /// - `InvalidArguments` if a record is not of the target family
    /// - `InvalidOperation` if a record is destroyed
    ///
    /// Both are checked before anything is written. A driver error part way
    /// through drops the loaded list so the next read goes to storage.
    pub fn replace(&mut self, records: Vec<Record>) -> Result<()> {
        for record in &records {
            self.check_family(record)?;
            if record.is_destroyed() {
                return Err(Error::InvalidOperation(format!(
                    "can't add destroyed {} to {}",
                    record.model_name(),
                    self.assoc.name
                )));
            }
        }
        let owner_id = self.saved_owner_id()?;
        match self.replace_records(owner_id, records) {
            Ok(attached) => {
                self.owner.associations.insert(self.assoc.name.clone(), attached);
                Ok(())
            }
            Err(e) => {
                self.owner.associations.remove(&self.assoc.name);
                Err(e)
            }
        }
    }

    fn replace_records(&self, owner_id: ObjectId, records: Vec<Record>) -> Result<Vec<Record>> {
        let keep: HashSet<ObjectId> = records.iter().filter_map(Record::id).collect();

        let current = self
            .target
            .select_in(&self.scope(owner_id), Selector::All, &FindOptions::new())?
            .into_records();
        let mut detached = 0usize;
        for mut old in current {
            if old.id().map_or(false, |id| keep.contains(&id)) {
                continue;
            }
            old.set(&self.assoc.foreign_key, Value::Null)?;
            old.save()?;
            detached += 1;
        }

        let mut attached = Vec::with_capacity(records.len());
        for mut record in records {
            self.attach(&mut record, owner_id)?;
            attached.push(record);
        }
        debug!(
            target: "docmap::association",
            owner = self.owner.model_name(),
            association = %self.assoc.name,
            attached = attached.len(),
            detached,
            "Replaced association"
        );
        Ok(attached)
    }

    // =========================================================================
    // Finders
    // =========================================================================

    /// Find one associated record by id
    ///
    /// An id that belongs to another owner fails with `DocumentNotFound`.
    pub fn find(&self, id: impl Into<Value>) -> Result<Record> {
        let id = id.into();
        match self.owner.id() {
            Some(owner_id) => self.target.find_in(&self.scope(owner_id), id),
            None => Err(self.not_found(vec![to_object_id(&id)?])),
        }
    }

    /// Find several associated records by id; all must belong to the owner
    pub fn find_many<I, V>(&self, ids: I) -> Result<Vec<Record>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        match self.owner.id() {
            Some(owner_id) => self.target.find_many_in(&self.scope(owner_id), ids),
            None => {
                let ids = ids.iter().map(to_object_id).collect::<Result<Vec<_>>>()?;
                Err(self.not_found(ids))
            }
        }
    }

    /// Selector-based find within the association
    pub fn find_with(&self, selector: Selector, options: FindOptions) -> Result<Found> {
        match self.owner.id() {
            Some(owner_id) => self.target.select_in(&self.scope(owner_id), selector, &options),
            None => Ok(match selector {
                Selector::All => Found::Many(Vec::new()),
                Selector::First | Selector::Last => Found::One(None),
            }),
        }
    }

    /// All associated records matching `options`
    pub fn all(&self, options: FindOptions) -> Result<Vec<Record>> {
        Ok(self.find_with(Selector::All, options)?.into_records())
    }

    /// First associated record
    pub fn first(&self, options: FindOptions) -> Result<Option<Record>> {
        Ok(self.find_with(Selector::First, options)?.into_record())
    }

    /// Last associated record
    pub fn last(&self, options: FindOptions) -> Result<Option<Record>> {
        Ok(self.find_with(Selector::Last, options)?.into_record())
    }

    /// Count associated records matching `conditions`
    pub fn count(&self, conditions: Document) -> Result<u64> {
        match self.owner.id() {
            Some(owner_id) => self.target.count_in(&self.scope(owner_id), &conditions),
            None => Ok(0),
        }
    }

    /// One page of associated records
    pub fn paginate(&self, options: PaginateOptions) -> Result<Page<Record>> {
        match self.owner.id() {
            Some(owner_id) => self.target.paginate_in(&self.scope(owner_id), &options),
            None => {
                let per_page = options
                    .per_page
                    .unwrap_or(self.target.database().config().default_per_page);
                Ok(Page::new(Vec::new(), 0, Pagination::new(per_page, options.page)?))
            }
        }
    }
}
