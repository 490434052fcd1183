//! 12-byte document identifiers
//!
//! An `ObjectId` is the primary key assigned to a document on first insert.
//! Layout (big-endian):
//!
//! | bytes | content |
//! |-------|---------|
//! | 0..4  | seconds since Unix epoch |
//! | 4..9  | per-process random value |
//! | 9..12 | incrementing counter (starts at a random value) |
//!
//! The textual form is always 24 lowercase hex characters. Ids generated by
//! one process sort in creation order.

use crate::error::{Error, Result};
use crate::timestamp::Timestamp;
use crate::value::Value;
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

/// Length of the textual (hex) form of an id
pub const HEX_LEN: usize = 24;

const COUNTER_MASK: u32 = 0x00FF_FFFF;

static PROCESS_SEED: Lazy<[u8; 16]> = Lazy::new(|| Uuid::new_v4().into_bytes());

static COUNTER: Lazy<AtomicU32> = Lazy::new(|| {
    let seed = *PROCESS_SEED;
    AtomicU32::new(u32::from_be_bytes([0, seed[5], seed[6], seed[7]]))
});

/// Unique 12-byte identifier rendered as 24 hex characters
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generate a fresh id
    pub fn new() -> Self {
        let secs = Timestamp::now().as_secs() as u32;
        let count = COUNTER.fetch_add(1, Ordering::SeqCst) & COUNTER_MASK;
        let seed = *PROCESS_SEED;

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&seed[0..5]);
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..4]);
        ObjectId(bytes)
    }

    /// Create an id from raw bytes
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId(bytes)
    }

    /// Get the raw bytes of this id
    pub const fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Parse the 24-hex-character textual form
    ///
    /// # Errors
    ///
    /// Returns `Error::IllegalId` for anything that is not exactly 24 hex
    /// characters.
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() != HEX_LEN {
            return Err(Error::IllegalId(format!(
                "expected {} hex characters, got {:?}",
                HEX_LEN, s
            )));
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| Error::IllegalId(format!("{:?}: {}", s, e)))?;
        Ok(ObjectId(bytes))
    }

    /// Check whether a string is a structurally valid id
    pub fn is_valid(s: &str) -> bool {
        s.len() == HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Render as 24 lowercase hex characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Creation time encoded in the id (second precision)
    pub fn timestamp(&self) -> Timestamp {
        let secs = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        Timestamp::from_secs(u64::from(secs))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ObjectId::parse(s)
    }
}

impl TryFrom<&Value> for ObjectId {
    type Error = Error;

    /// Accepts `Value::ObjectId` or a 24-hex `Value::String`
    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::ObjectId(id) => Ok(*id),
            Value::String(s) => ObjectId::parse(s),
            other => Err(Error::IllegalId(format!(
                "{} is not an id ({})",
                other,
                other.type_name()
            ))),
        }
    }
}

impl TryFrom<Value> for ObjectId {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        ObjectId::try_from(&value)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ObjectId::parse(&s).map_err(serde::de::Error::custom)
    }
}
