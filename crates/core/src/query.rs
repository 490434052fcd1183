//! Native query vocabulary shared by the engine and storage drivers
//!
//! A [`NativeQuery`] is what the query translator produces and what a
//! [`Driver`](crate::Driver) executes: a filter document, an ordered list of
//! sort keys, and optional limit / skip.
//!
//! ## Filter documents
//!
//! Each entry of the filter is `field => condition`. A condition is either a
//! plain value (equality) or an operator object such as
//! `{"$in": [26, 27]}`. An empty filter matches every document.

use crate::value::Document;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the primary key field in stored documents
pub const ID_FIELD: &str = "_id";

/// Sort direction for a single sort key or index field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    /// Smallest first (`1`)
    Ascending,
    /// Largest first (`-1`)
    Descending,
}

impl SortDirection {
    /// Numeric form used in index names (`1` / `-1`)
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }

    /// Parse a numeric direction (`1` / `-1`)
    pub fn from_i32(n: i32) -> Option<Self> {
        match n {
            1 => Some(SortDirection::Ascending),
            -1 => Some(SortDirection::Descending),
            _ => None,
        }
    }

    /// Parse `asc` / `desc`, case-insensitively
    pub fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("asc") {
            Some(SortDirection::Ascending)
        } else if token.eq_ignore_ascii_case("desc") {
            Some(SortDirection::Descending)
        } else {
            None
        }
    }

    /// The opposite direction
    pub fn reverse(&self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

/// One component of a sort specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    /// Order by a document field
    Field {
        /// Field name
        field: String,
        /// Direction
        direction: SortDirection,
    },
    /// Storage-native insertion order
    Natural(SortDirection),
}

impl SortKey {
    /// Sort by `field` ascending
    pub fn asc(field: impl Into<String>) -> Self {
        SortKey::Field {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Sort by `field` descending
    pub fn desc(field: impl Into<String>) -> Self {
        SortKey::Field {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Direction of this key
    pub fn direction(&self) -> SortDirection {
        match self {
            SortKey::Field { direction, .. } => *direction,
            SortKey::Natural(direction) => *direction,
        }
    }

    /// The same key with its direction flipped
    pub fn reversed(&self) -> Self {
        match self {
            SortKey::Field { field, direction } => SortKey::Field {
                field: field.clone(),
                direction: direction.reverse(),
            },
            SortKey::Natural(direction) => SortKey::Natural(direction.reverse()),
        }
    }
}

/// A filter plus sort / pagination, as executed by a driver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeQuery {
    /// Filter document; empty matches all
    pub filter: Document,
    /// Sort keys in priority order; empty means natural order
    pub sort: Vec<SortKey>,
    /// Maximum number of documents to return
    pub limit: Option<usize>,
    /// Number of matching documents to skip
    pub skip: Option<usize>,
}

impl NativeQuery {
    /// Query with the given filter and no sort / pagination
    pub fn new(filter: Document) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Set the sort keys
    pub fn with_sort(mut self, sort: Vec<SortKey>) -> Self {
        self.sort = sort;
        self
    }

    /// Set the limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the skip count
    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }
}
