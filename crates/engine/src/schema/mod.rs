//! Key registry: declared keys of a record family
//!
//! A [`Schema`] is an immutable value built once at startup with a
//! consuming builder and handed to the [`Catalog`](crate::Catalog). There is
//! no global registry; every record operation consults the schema it was
//! bound to.
//!
//! ## Schema kinds
//!
//! - **document**: a root record type stored in its own collection
//! - **subtype**: shares its parent's collection and inherits its keys,
//!   default order and associations; stored documents carry `_type`
//! - **embedded**: keys only, stored inline inside an owning document

pub mod coerce;

pub use coerce::coerce;

use docmap_core::Value;
use std::sync::Arc;

/// Discriminator field of polymorphic families
pub const TYPE_KEY: &str = "_type";
/// Set once, on first save
pub const CREATED_AT: &str = "created_at";
/// Refreshed on every save
pub const UPDATED_AT: &str = "updated_at";

// =============================================================================
// Key definitions
// =============================================================================

/// Declared type of a key; drives coercion on every write
#[derive(Debug, Clone, PartialEq)]
pub enum KeyType {
    /// UTF-8 text
    String,
    /// 64-bit signed integer
    Integer,
    /// 64-bit float
    Float,
    /// true / false
    Boolean,
    /// Point in time (microsecond precision)
    Time,
    /// Document identifier, e.g. a foreign key
    ObjectId,
    /// Ordered sequence of arbitrary values
    Array,
    /// Key-value mapping with indifferent key access
    Hash,
    /// Nested document described by an embedded schema
    Embedded(Arc<Schema>),
}

impl KeyType {
    /// Value a key of this type holds when unset and without default
    pub fn zero_value(&self) -> Value {
        match self {
            KeyType::Array => Value::Array(Vec::new()),
            KeyType::Hash => Value::Object(Default::default()),
            _ => Value::Null,
        }
    }

    /// Whether query conditions should coerce values to this type
    pub fn is_scalar(&self) -> bool {
        !matches!(self, KeyType::Array | KeyType::Hash | KeyType::Embedded(_))
    }
}

/// One declared key
#[derive(Debug, Clone, PartialEq)]
pub struct KeyDef {
    name: String,
    key_type: KeyType,
    default: Option<Value>,
    indexed: bool,
}

impl KeyDef {
    /// Declare a key with no default, not indexed
    pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
        let name = name.into();
        Self {
            name: docmap_core::normalize_key(&name).to_string(),
            key_type,
            default: None,
            indexed: false,
        }
    }

    /// Value used when the key is unset or assigned null
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Request an index on this key when the model is first bound
    pub fn indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    /// Key name (canonical form)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    pub fn key_type(&self) -> &KeyType {
        &self.key_type
    }

    /// Explicit default, if declared
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Whether an index was requested
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// The value an unset key starts with: the default or the type's zero value
    pub fn initial_value(&self) -> Value {
        match &self.default {
            Some(default) => coerce(&self.key_type, default.clone()),
            None => self.key_type.zero_value(),
        }
    }

    /// Coerce an assigned value to this key's type
    ///
    /// Null and unrecognised values fall back to [`KeyDef::initial_value`].
    pub fn coerce(&self, value: Value) -> Value {
        match coerce(&self.key_type, value) {
            Value::Null => self.initial_value(),
            coerced => coerced,
        }
    }
}

// =============================================================================
// Associations
// =============================================================================

/// One-to-many association from an owner to a (possibly polymorphic) family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HasMany {
    name: String,
    target: String,
    foreign_key: Option<String>,
}

impl HasMany {
    /// Association name as used with `Record::association`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target model name
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Foreign key on the target, derived from the owner name when not given
    pub fn foreign_key_for(&self, owner: &str) -> String {
        match &self.foreign_key {
            Some(key) => key.clone(),
            None => format!("{}_id", snake_case(owner)),
        }
    }
}

// =============================================================================
// Schema
// =============================================================================

/// What kind of record type a schema describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaKind {
    /// Root record type with its own collection
    Document {
        /// Explicit collection name; derived from the type name when `None`
        collection: Option<String>,
    },
    /// Member of the parent's polymorphic family
    Subtype {
        /// Parent model name
        parent: String,
    },
    /// Inline sub-document
    Embedded,
}

/// Declared keys and options of one record type
///
/// ```
/// use docmap_engine::{KeyType, Schema};
///
/// let users = Schema::document("User")
///     .collection("users")
///     .key("first_name", KeyType::String)
///     .key("age", KeyType::Integer);
/// assert_eq!(users.keys().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    kind: SchemaKind,
    keys: Vec<KeyDef>,
    polymorphic: bool,
    default_order: Option<String>,
    associations: Vec<HasMany>,
}

impl Schema {
    fn with_kind(name: impl Into<String>, kind: SchemaKind) -> Self {
        Self {
            name: name.into(),
            kind,
            keys: Vec::new(),
            polymorphic: false,
            default_order: None,
            associations: Vec::new(),
        }
    }

    /// Root record type stored in its own collection
    pub fn document(name: impl Into<String>) -> Self {
        Self::with_kind(name, SchemaKind::Document { collection: None })
    }

    /// Subtype sharing `parent`'s collection
    pub fn subtype(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            SchemaKind::Subtype {
                parent: parent.into(),
            },
        )
    }

    /// Embedded sub-document type
    pub fn embedded(name: impl Into<String>) -> Self {
        Self::with_kind(name, SchemaKind::Embedded)
    }

    // -------------------------------------------------------------------------
    // Builder
    // -------------------------------------------------------------------------

    /// Override the collection name (document schemas only)
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        if let SchemaKind::Document { collection: slot } = &mut self.kind {
            *slot = Some(collection.into());
        }
        self
    }

    /// Declare a key; redeclaring a name replaces the earlier definition
    pub fn key(self, name: impl Into<String>, key_type: KeyType) -> Self {
        self.key_def(KeyDef::new(name, key_type))
    }

    /// Declare a fully specified key
    pub fn key_def(mut self, def: KeyDef) -> Self {
        match self.keys.iter_mut().find(|k| k.name == def.name) {
            Some(existing) => *existing = def,
            None => self.keys.push(def),
        }
        self
    }

    /// Mark as the root of a polymorphic family (adds `_type`)
    pub fn polymorphic(mut self) -> Self {
        self.polymorphic = true;
        self
    }

    /// Order clause applied when a query gives none, e.g. `"position asc"`
    pub fn default_order(mut self, order: impl Into<String>) -> Self {
        self.default_order = Some(order.into());
        self
    }

    /// Declare a one-to-many association with a derived foreign key
    pub fn has_many(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.associations.push(HasMany {
            name: name.into(),
            target: target.into(),
            foreign_key: None,
        });
        self
    }

    /// Declare a one-to-many association with an explicit foreign key
    pub fn has_many_with_key(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.associations.push(HasMany {
            name: name.into(),
            target: target.into(),
            foreign_key: Some(foreign_key.into()),
        });
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema kind
    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    /// Keys declared directly on this schema, in declaration order
    pub fn keys(&self) -> &[KeyDef] {
        &self.keys
    }

    /// Look up a directly declared key
    pub fn key_named(&self, name: &str) -> Option<&KeyDef> {
        let name = docmap_core::normalize_key(name);
        self.keys.iter().find(|k| k.name == name)
    }

    /// Whether this schema was declared as a polymorphic root
    pub fn is_polymorphic(&self) -> bool {
        self.polymorphic
    }

    /// Declared default order clause
    pub fn default_order_clause(&self) -> Option<&str> {
        self.default_order.as_deref()
    }

    /// Associations declared directly on this schema
    pub fn associations(&self) -> &[HasMany] {
        &self.associations
    }
}

/// `ChatRoom` → `chat_room`
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Default collection name for a root type: snake case, naively pluralized
pub fn collection_name_for(type_name: &str) -> String {
    let base = snake_case(type_name);
    if base.ends_with('s') || base.ends_with('x') || base.ends_with("sh") || base.ends_with("ch") {
        format!("{}es", base)
    } else if let Some(stem) = base.strip_suffix('y') {
        match stem.chars().last() {
            Some('a' | 'e' | 'i' | 'o' | 'u') | None => format!("{}s", base),
            Some(_) => format!("{}ies", stem),
        }
    } else {
        format!("{}s", base)
    }
}
