//! Type coercion for declared keys
//!
//! | Type      | Accepts                                   | Otherwise    |
//! |-----------|-------------------------------------------|--------------|
//! | String    | strings; numbers, bools, ids, times as text | Null       |
//! | Integer   | ints, truncated floats, numeric strings, bools | 0       |
//! | Float     | floats, ints, numeric strings             | 0.0          |
//! | Boolean   | bools, ints, `true/t/1/yes`, `false/f/0/no` | Null       |
//! | Time      | times, RFC 3339 strings, epoch millis     | Null         |
//! | ObjectId  | ids, 24-hex strings                       | Null         |
//! | Array     | arrays                                    | Null         |
//! | Hash      | objects (keys normalized)                 | Null         |
//! | Embedded  | objects, coerced per the embedded schema  | Null         |
//!
//! Null always coerces to Null; the caller substitutes the key's default.

use super::{KeyType, Schema};
use docmap_core::{normalize_document, normalize_key, Document, ObjectId, Timestamp, Value};

/// Coerce `value` to `key_type`
pub fn coerce(key_type: &KeyType, value: Value) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match key_type {
        KeyType::String => to_string(value),
        KeyType::Integer => Value::Int(to_integer(&value)),
        KeyType::Float => Value::Float(to_float(&value)),
        KeyType::Boolean => to_boolean(&value),
        KeyType::Time => to_time(&value),
        KeyType::ObjectId => ObjectId::try_from(&value)
            .map(Value::ObjectId)
            .unwrap_or(Value::Null),
        KeyType::Array => match value {
            Value::Array(items) => Value::Array(items.into_iter().map(Value::normalized).collect()),
            _ => Value::Null,
        },
        KeyType::Hash => match value {
            Value::Object(doc) => Value::Object(normalize_document(doc)),
            _ => Value::Null,
        },
        KeyType::Embedded(schema) => match value {
            Value::Object(doc) => Value::Object(coerce_embedded(schema, doc)),
            _ => Value::Null,
        },
    }
}

/// Coerce every declared key of an embedded document
///
/// Undeclared keys are kept as given (normalized).
pub fn coerce_embedded(schema: &Schema, doc: Document) -> Document {
    let mut out = Document::new();
    for (key, value) in doc {
        let key = normalize_key(&key).to_string();
        let value = match schema.key_named(&key) {
            Some(def) => def.coerce(value),
            None => value.normalized(),
        };
        out.insert(key, value);
    }
    for def in schema.keys() {
        if !out.contains_key(def.name()) {
            out.insert(def.name().to_string(), def.initial_value());
        }
    }
    out
}

fn to_string(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s),
        Value::Int(i) => Value::String(i.to_string()),
        Value::Float(f) => Value::String(f.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        Value::ObjectId(id) => Value::String(id.to_hex()),
        Value::Timestamp(ts) => Value::String(ts.to_rfc3339()),
        _ => Value::Null,
    }
}

fn to_integer(value: &Value) -> i64 {
    match value {
        Value::Int(i) => *i,
        Value::Float(f) if f.is_finite() => f.trunc() as i64,
        Value::Bool(b) => i64::from(*b),
        Value::String(s) => parse_integer(s),
        _ => 0,
    }
}

/// Leading integer of a string, tolerating a fractional part: `"27.9"` → 27
fn parse_integer(s: &str) -> i64 {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return i;
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => f.trunc() as i64,
        _ => 0,
    }
}

fn to_float(value: &Value) -> f64 {
    match value {
        Value::Float(f) => *f,
        Value::Int(i) => *i as f64,
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn to_boolean(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::Bool(*b),
        Value::Int(i) => Value::Bool(*i != 0),
        Value::Float(f) => Value::Bool(*f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" | "y" => Value::Bool(true),
            "false" | "f" | "0" | "no" | "n" | "" => Value::Bool(false),
            _ => Value::Null,
        },
        _ => Value::Null,
    }
}

fn to_time(value: &Value) -> Value {
    match value {
        Value::Timestamp(ts) => Value::Timestamp(*ts),
        Value::String(s) => Timestamp::parse_rfc3339(s)
            .map(Value::Timestamp)
            .unwrap_or(Value::Null),
        Value::Int(ms) if *ms >= 0 => Value::Timestamp(Timestamp::from_millis(*ms as u64)),
        _ => Value::Null,
    }
}
