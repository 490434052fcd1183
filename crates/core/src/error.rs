//! Error types for docmap
//!
//! This module defines the error taxonomy surfaced by the mapping engine and
//! the narrower error type returned by storage drivers.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Driver failures are wrapped exactly once (`Error::Driver`) and never
//! rewritten by the engine; retry and backoff belong to the driver.

use thiserror::Error;

/// Result type alias for docmap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for storage driver operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Error types surfaced to docmap callers
#[derive(Debug, Error)]
pub enum Error {
    /// One or more requested ids are absent from the (possibly scoped) collection
    #[error("Document not found in '{collection}': {}", .ids.join(", "))]
    DocumentNotFound {
        /// Collection that was searched
        collection: String,
        /// Every id that was requested
        ids: Vec<String>,
    },

    /// An id argument is not a structurally valid identifier
    #[error("Illegal ID: {0}")]
    IllegalId(String),

    /// Required arguments are missing or have the wrong shape
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Operation not permitted in the record's current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// No model with this name is registered in the catalog
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// The model declares no association with this name
    #[error("Unknown association '{name}' on {model}")]
    UnknownAssociation {
        /// Owner model name
        model: String,
        /// Requested association name
        name: String,
    },

    /// Invalid mapper configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage driver failure, propagated unmodified
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

impl Error {
    /// Build a `DocumentNotFound` for the given collection and ids
    pub fn document_not_found<I, S>(collection: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Error::DocumentNotFound {
            collection: collection.to_string(),
            ids: ids.into_iter().map(|id| id.to_string()).collect(),
        }
    }

    /// Check if this is a `DocumentNotFound` error
    pub fn is_document_not_found(&self) -> bool {
        matches!(self, Error::DocumentNotFound { .. })
    }
}

/// Errors returned by a storage driver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// `update` targeted an id that is not stored
    #[error("no document with _id {id} in '{collection}'")]
    NotFound {
        /// Collection name
        collection: String,
        /// Hex id that was not found
        id: String,
    },

    /// A unique index rejected the write
    #[error("duplicate key for index '{index}' in '{collection}'")]
    DuplicateKey {
        /// Collection name
        collection: String,
        /// Name of the violated index
        index: String,
    },

    /// Opaque backend failure (network, storage, ...)
    #[error("{0}")]
    Backend(String),
}
