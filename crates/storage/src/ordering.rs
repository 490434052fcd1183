//! Sorting of stored documents
//!
//! Sort keys apply in priority order. `SortKey::Natural` orders by insertion
//! sequence. Ties left after every key fall back to ascending natural order,
//! so the result is deterministic. Missing fields sort as null.

use crate::collection::StoredDocument;
use crate::matcher::lookup;
use docmap_core::{SortDirection, SortKey, Value};
use std::cmp::Ordering;

/// Sort documents in place according to `keys`
pub fn sort_documents(documents: &mut [&StoredDocument], keys: &[SortKey]) {
    documents.sort_by(|a, b| compare(a, b, keys));
}

fn compare(a: &StoredDocument, b: &StoredDocument, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = match key {
            SortKey::Natural(direction) => apply(a.seq().cmp(&b.seq()), *direction),
            SortKey::Field { field, direction } => {
                let left = lookup(a.document(), field).unwrap_or(&Value::Null);
                let right = lookup(b.document(), field).unwrap_or(&Value::Null);
                apply(left.sort_cmp(right), *direction)
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.seq().cmp(&b.seq())
}

fn apply(ord: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ord,
        SortDirection::Descending => ord.reverse(),
    }
}
