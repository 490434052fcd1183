//! Filter evaluation
//!
//! A filter is a document of `field => condition`. All entries must hold for
//! a document to match (conjunction). A condition is either:
//! - a plain value: equality; when the stored field is an array, the
//!   condition also matches any single element
//! - an operator object whose keys all start with `$`
//!
//! Field names may be dotted paths into nested objects (`address.city`).
//! Numbers compare numerically (`27 == 27.0`).

use docmap_core::{Document, DriverError, DriverResult, Value};
use std::cmp::Ordering;

/// Check whether `document` satisfies every condition of `filter`
///
/// # Errors
///
/// Returns `DriverError::Backend` for unknown operators or operator
/// arguments of the wrong shape.
pub fn matches(document: &Document, filter: &Document) -> DriverResult<bool> {
    for (field, condition) in filter {
        let stored = lookup(document, field);
        if !matches_condition(stored, condition)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Resolve a possibly dotted field path
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    if let Some(value) = document.get(path) {
        return Some(value);
    }
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }
    Some(current)
}

fn is_operator_object(condition: &Value) -> bool {
    match condition {
        Value::Object(doc) => !doc.is_empty() && doc.keys().all(|k| k.starts_with('$')),
        _ => false,
    }
}

fn matches_condition(stored: Option<&Value>, condition: &Value) -> DriverResult<bool> {
    if !is_operator_object(condition) {
        return Ok(equals(stored, condition));
    }
    let Value::Object(operators) = condition else {
        return Ok(false);
    };
    for (op, arg) in operators {
        let ok = match op.as_str() {
            "$in" => any_of(stored, candidates(op, arg)?),
            "$nin" => !any_of(stored, candidates(op, arg)?),
            "$ne" => !equals(stored, arg),
            "$gt" => compare(stored, arg, |o| o == Ordering::Greater),
            "$gte" => compare(stored, arg, |o| o != Ordering::Less),
            "$lt" => compare(stored, arg, |o| o == Ordering::Less),
            "$lte" => compare(stored, arg, |o| o != Ordering::Greater),
            "$exists" => {
                let want = arg.as_bool().ok_or_else(|| {
                    DriverError::Backend(format!("$exists expects a boolean, got {}", arg))
                })?;
                stored.is_some() == want
            }
            other => {
                return Err(DriverError::Backend(format!("unknown operator {}", other)));
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn candidates<'a>(op: &str, arg: &'a Value) -> DriverResult<&'a [Value]> {
    arg.as_array()
        .ok_or_else(|| DriverError::Backend(format!("{} expects an array, got {}", op, arg)))
}

/// Equality with null-matches-missing and array-element semantics
fn equals(stored: Option<&Value>, expected: &Value) -> bool {
    match stored {
        None => expected.is_null(),
        Some(value) => {
            if value.loosely_equals(expected) {
                return true;
            }
            match value {
                Value::Array(items) => items.iter().any(|item| item.loosely_equals(expected)),
                _ => false,
            }
        }
    }
}

fn any_of(stored: Option<&Value>, candidates: &[Value]) -> bool {
    candidates.iter().any(|candidate| equals(stored, candidate))
}

/// Comparison operators only match values of the same type bracket
fn compare(stored: Option<&Value>, arg: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let Some(value) = stored else {
        return false;
    };
    let comparable = |v: &Value| {
        (v.is_number() && arg.is_number()) || v.type_name() == arg.type_name()
    };
    match value {
        Value::Array(items) if !arg.is_array() => items
            .iter()
            .any(|item| comparable(item) && accept(item.sort_cmp(arg))),
        _ => comparable(value) && accept(value.sort_cmp(arg)),
    }
}
