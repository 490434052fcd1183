//! docmap - object-document mapper
//!
//! docmap binds declared record types to collections of a document store.
//! Keys are typed and coerced on write, queries are written as condition
//! documents and `"field dir"` order clauses, subtypes share their root's
//! collection through a `_type` discriminator, and has-many associations
//! are exposed as owner-scoped proxies.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use docmap::prelude::*;
//!
//! let catalog = Catalog::builder()
//!     .register(
//!         Schema::document("User")
//!             .key("first_name", KeyType::String)
//!             .key("age", KeyType::Integer),
//!     )
//!     .build()?;
//! let db = Database::new(Arc::new(MemoryDriver::new()), catalog);
//!
//! let users = db.model("User")?;
//! let john = users.create(doc! { "first_name" => "John", "age" => "27" })?;
//! assert_eq!(john.get("age"), &Value::Int(27));
//! assert_eq!(users.find(john.id().unwrap())?, john);
//! # Ok::<(), docmap::Error>(())
//! ```
//!
//! # Architecture
//!
//! - `docmap-core`: values, ids, errors, the [`Driver`] trait
//! - `docmap-storage`: [`MemoryDriver`], an in-process driver
//! - `docmap-engine`: schemas, models, records, association proxies

pub use docmap_core::{
    doc, normalize_key, Document, Driver, DriverError, DriverResult, Error, IndexOptions,
    IndexSpec, NativeQuery, ObjectId, Result, SortDirection, SortKey, Timestamp, Value, ID_FIELD,
};
pub use docmap_engine::{
    parse_order, AssociationDef, AttributeStore, Catalog, CatalogBuilder, Database,
    EmbeddedRecord, FindOptions, Found, HasMany, KeyDef, KeyType, ManyProxy, MapperConfig,
    Model, ModelDef, Page, PaginateOptions, Pagination, QueryTranslator, Record, RecordState,
    Schema, SchemaKind, Selector, CONFIG_FILE_NAME, CREATED_AT, TYPE_KEY, UPDATED_AT,
};
pub use docmap_storage::MemoryDriver;

/// Everything needed to declare schemas and work with records
pub mod prelude {
    pub use crate::{
        doc, Catalog, Database, Document, Driver, Error, FindOptions, IndexOptions, IndexSpec,
        KeyDef, KeyType, MapperConfig, MemoryDriver, Model, ObjectId, PaginateOptions, Record,
        Result, Schema, Selector, Value,
    };
}
