//! Core types and traits for docmap
//!
//! This crate defines the foundational types shared by the storage layer and
//! the mapping engine:
//! - Value: Unified value enum for every field stored in a document
//! - Document: String-keyed mapping of values (a stored row)
//! - ObjectId: 24-hex-character primary key
//! - Timestamp: Microsecond-precision point in time
//! - Error: Error taxonomy surfaced to callers
//! - Driver: The narrow storage contract consumed by the engine
//! - NativeQuery / SortKey / IndexSpec: Native query and index vocabulary

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod index;
mod macros;
pub mod object_id;
pub mod query;
pub mod timestamp;
pub mod traits;
pub mod value;

pub use error::{DriverError, DriverResult, Error, Result};
pub use index::{IndexOptions, IndexSpec};
pub use object_id::ObjectId;
pub use query::{NativeQuery, SortDirection, SortKey, ID_FIELD};
pub use timestamp::Timestamp;
pub use traits::Driver;
pub use value::{normalize_document, normalize_key, Document, Value};
