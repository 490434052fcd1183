//! Mapping engine for docmap
//!
//! This crate turns declared schemas into records stored through a
//! [`Driver`](docmap_core::Driver):
//! - Schema & catalog: typed keys, subtypes, associations
//! - Query translation: conditions, order clauses, pagination
//! - Model: class-level finders, bulk update/delete, indexes
//! - Record: attribute access, save/destroy lifecycle, timestamps
//! - ManyProxy: owner-scoped, polymorphic has-many associations
//!
//! The engine never talks to storage except through the driver trait, and
//! holds no global state: everything hangs off a [`Database`] handle.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod association;
pub mod attributes;
pub mod catalog;
pub mod config;
pub mod database;
pub mod embedded;
pub mod model;
pub mod pagination;
pub mod query;
pub mod record;
pub mod schema;

pub use association::ManyProxy;
pub use attributes::AttributeStore;
pub use catalog::{AssociationDef, Catalog, CatalogBuilder, ModelDef};
pub use config::{MapperConfig, CONFIG_FILE_NAME};
pub use database::Database;
pub use embedded::EmbeddedRecord;
pub use model::{Found, Model};
pub use pagination::{Page, PaginateOptions, Pagination};
pub use query::{parse_order, FindOptions, QueryTranslator, Selector};
pub use record::{Record, RecordState};
pub use schema::{HasMany, KeyDef, KeyType, Schema, SchemaKind, CREATED_AT, TYPE_KEY, UPDATED_AT};
