//! Shared test utilities for the integration suites.
//!
//! Import via `mod common;` from any test file.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::collections::BTreeMap;
use std::sync::{Arc, Once};

use parking_lot::Mutex;

pub use docmap::prelude::*;
pub use docmap::{
    DriverResult, IndexSpec, NativeQuery, SortDirection, Timestamp, TYPE_KEY,
};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route engine logs to the test writer (shown for failing tests only)
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

// ============================================================================
// Schemas
// ============================================================================

/// Embedded address
pub fn address_schema() -> Arc<Schema> {
    Arc::new(
        Schema::embedded("Address")
            .key("address", KeyType::String)
            .key("city", KeyType::String)
            .key("state", KeyType::String)
            .key("zip", KeyType::Integer),
    )
}

/// Every record type the suites use
pub fn catalog() -> Catalog {
    Catalog::builder()
        .register(
            Schema::document("User")
                .collection("users")
                .key("first_name", KeyType::String)
                .key("last_name", KeyType::String)
                .key("age", KeyType::Integer)
                .key("tags", KeyType::Array)
                .key("preferences", KeyType::Hash)
                .key("address", KeyType::Embedded(address_schema())),
        )
        .register(
            Schema::document("Person")
                .collection("people")
                .key("name", KeyType::String)
                .key_def(KeyDef::new("father", KeyType::String).indexed(true)),
        )
        .register(Schema::document("Ghost").collection("ghosts").key("name", KeyType::String))
        .register(
            Schema::document("Room")
                .key("name", KeyType::String)
                .has_many("messages", "Message"),
        )
        .register(
            Schema::document("Message")
                .key("body", KeyType::String)
                .polymorphic(),
        )
        .register(Schema::subtype("Enter", "Message"))
        .register(Schema::subtype("Exit", "Message"))
        .register(Schema::subtype("Chat", "Message").key("mood", KeyType::String))
        .build()
        .expect("test catalog is valid")
}

// ============================================================================
// RecordingDriver - MemoryDriver that logs every call
// ============================================================================

/// Wraps [`MemoryDriver`], recording operation names and index options
#[derive(Debug, Default)]
pub struct RecordingDriver {
    inner: MemoryDriver,
    calls: Mutex<Vec<String>>,
    index_options: Mutex<Vec<(String, IndexOptions)>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, op: &str, collection: &str) {
        self.calls.lock().push(format!("{}:{}", op, collection));
    }

    /// `op:collection` entries in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    /// `(index name, options)` for every `ensure_index` call
    pub fn index_options(&self) -> Vec<(String, IndexOptions)> {
        self.index_options.lock().clone()
    }
}

impl Driver for RecordingDriver {
    fn insert(&self, collection: &str, document: Document) -> DriverResult<ObjectId> {
        self.record("insert", collection);
        self.inner.insert(collection, document)
    }

    fn update(&self, collection: &str, id: &ObjectId, document: Document) -> DriverResult<()> {
        self.record("update", collection);
        self.inner.update(collection, id, document)
    }

    fn remove(&self, collection: &str, filter: &Document) -> DriverResult<u64> {
        self.record("remove", collection);
        self.inner.remove(collection, filter)
    }

    fn find(&self, collection: &str, query: &NativeQuery) -> DriverResult<Vec<Document>> {
        self.record("find", collection);
        self.inner.find(collection, query)
    }

    fn count(&self, collection: &str, filter: &Document) -> DriverResult<u64> {
        self.record("count", collection);
        self.inner.count(collection, filter)
    }

    fn ensure_index(
        &self,
        collection: &str,
        spec: &IndexSpec,
        options: &IndexOptions,
    ) -> DriverResult<String> {
        self.record("ensure_index", collection);
        let name = self.inner.ensure_index(collection, spec, options)?;
        self.index_options.lock().push((name.clone(), options.clone()));
        Ok(name)
    }

    fn index_information(&self, collection: &str) -> DriverResult<BTreeMap<String, IndexSpec>> {
        self.inner.index_information(collection)
    }

    fn drop_indexes(&self, collection: &str) -> DriverResult<()> {
        self.record("drop_indexes", collection);
        self.inner.drop_indexes(collection)
    }

    fn drop_collection(&self, collection: &str) -> DriverResult<()> {
        self.record("drop_collection", collection);
        self.inner.drop_collection(collection)
    }

    fn collection_names(&self) -> DriverResult<Vec<String>> {
        self.inner.collection_names()
    }
}

// ============================================================================
// TestDb - database over a RecordingDriver
// ============================================================================

pub struct TestDb {
    pub driver: Arc<RecordingDriver>,
    pub db: Database,
}

impl TestDb {
    pub fn new() -> Self {
        Self::with_config(MapperConfig::default())
    }

    pub fn with_config(config: MapperConfig) -> Self {
        init_tracing();
        let driver = Arc::new(RecordingDriver::new());
        let db = Database::with_config(driver.clone(), catalog(), config)
            .expect("test config is valid");
        Self { driver, db }
    }

    pub fn model(&self, name: &str) -> Model {
        self.db.model(name).expect("model is registered")
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// John (27), Steve (28), Steph (26), inserted in that order
pub fn seed_users(users: &Model) -> (Record, Record, Record) {
    let john = users
        .create(doc! { "first_name" => "John", "last_name" => "Nunemaker", "age" => "27" })
        .unwrap();
    let steve = users
        .create(doc! { "first_name" => "Steve", "last_name" => "Smith", "age" => "28" })
        .unwrap();
    let steph = users
        .create(doc! { "first_name" => "Steph", "last_name" => "Nunemaker", "age" => "26" })
        .unwrap();
    (john, steve, steph)
}
