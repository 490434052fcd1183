//! Index specifications
//!
//! An [`IndexSpec`] is an ordered list of `(field, direction)` pairs. Its
//! name is derived from the pairs in the order given, joined with
//! underscores: `[(first_name, 1), (last_name, -1)]` is named
//! `first_name_1_last_name_-1`. Two specs with the same pairs in the same
//! order are the same index.

use crate::query::SortDirection;
use serde::{Deserialize, Serialize};

/// Ordered key specification of an index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexSpec {
    keys: Vec<(String, SortDirection)>,
}

impl IndexSpec {
    /// Ascending index on one field
    pub fn single(field: impl Into<String>) -> Self {
        Self {
            keys: vec![(field.into(), SortDirection::Ascending)],
        }
    }

    /// Compound index over the given pairs, in order
    pub fn compound<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = (S, SortDirection)>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(|(f, d)| (f.into(), d)).collect(),
        }
    }

    /// Index name: underscore-joined `field_direction` pairs
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|(field, dir)| format!("{}_{}", field, dir.as_i32()))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// The `(field, direction)` pairs in order
    pub fn keys(&self) -> &[(String, SortDirection)] {
        &self.keys
    }

    /// Field names in order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|(f, _)| f.as_str())
    }

    /// Check whether the spec contains this exact pair
    pub fn contains(&self, field: &str, direction: SortDirection) -> bool {
        self.keys.iter().any(|(f, d)| f == field && *d == direction)
    }

    /// Check if the spec has no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl From<&str> for IndexSpec {
    fn from(field: &str) -> Self {
        IndexSpec::single(field)
    }
}

impl From<String> for IndexSpec {
    fn from(field: String) -> Self {
        IndexSpec::single(field)
    }
}

/// Options forwarded verbatim to the driver's `ensure_index`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOptions {
    /// Reject documents that duplicate the indexed values
    #[serde(default)]
    pub unique: bool,
}

impl IndexOptions {
    /// Options for a unique index
    pub fn unique() -> Self {
        Self { unique: true }
    }
}
