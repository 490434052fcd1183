//! Catalog: the resolved set of record types
//!
//! The catalog turns the declared [`Schema`]s into [`ModelDef`]s:
//! - subtypes inherit their root's collection, keys, default order and
//!   associations
//! - polymorphic roots gain the `_type` discriminator key
//! - every `has_many` target root gains the foreign key (as ObjectId)
//! - every document type gains `created_at` / `updated_at`
//!
//! Once built the catalog is immutable and shared behind an `Arc`.
//! Hydration uses it to map a stored `_type` back to the concrete subtype.

use std::collections::BTreeMap;
use std::sync::Arc;

use docmap_core::{Document, Error, Result, Value};
use tracing::warn;

use crate::schema::{
    collection_name_for, KeyDef, KeyType, Schema, SchemaKind, CREATED_AT, TYPE_KEY,
    UPDATED_AT,
};

// =============================================================================
// ModelDef
// =============================================================================

/// A resolved association: owner side, with its foreign key fixed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationDef {
    /// Association name
    pub name: String,
    /// Target model name (usually a polymorphic root)
    pub target: String,
    /// Foreign key field on the target documents
    pub foreign_key: String,
}

/// Fully resolved record type
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDef {
    name: String,
    root: String,
    collection: String,
    keys: Vec<KeyDef>,
    polymorphic: bool,
    default_order: Option<String>,
    associations: Vec<AssociationDef>,
}

impl ModelDef {
    /// Concrete type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the family root (equal to `name` for roots)
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Whether this is a subtype of another model
    pub fn is_subtype(&self) -> bool {
        self.name != self.root
    }

    /// Physical collection shared by the whole family
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// All effective keys: inherited first, then own, then timestamps
    pub fn keys(&self) -> &[KeyDef] {
        &self.keys
    }

    /// Names of all effective keys
    pub fn key_names(&self) -> Vec<&str> {
        self.keys.iter().map(KeyDef::name).collect()
    }

    /// Look up an effective key (indifferent to `:` prefix)
    pub fn key(&self, name: &str) -> Option<&KeyDef> {
        let name = docmap_core::normalize_key(name);
        self.keys.iter().find(|k| k.name() == name)
    }

    /// Whether documents of this family carry `_type`
    pub fn is_polymorphic(&self) -> bool {
        self.polymorphic
    }

    /// Inherited or declared default order clause
    pub fn default_order(&self) -> Option<&str> {
        self.default_order.as_deref()
    }

    /// Associations this type owns
    pub fn associations(&self) -> &[AssociationDef] {
        &self.associations
    }

    /// Look up an owned association
    pub fn association(&self, name: &str) -> Result<&AssociationDef> {
        self.associations
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| Error::UnknownAssociation {
                model: self.name.clone(),
                name: name.to_string(),
            })
    }

    /// Keys declared with `indexed(true)`
    pub fn indexed_keys(&self) -> impl Iterator<Item = &KeyDef> {
        self.keys.iter().filter(|k| k.is_indexed())
    }

    /// Coerce a value for `key`; undeclared keys pass through normalized
    pub fn coerce(&self, key: &str, value: Value) -> Value {
        match self.key(key) {
            Some(def) => def.coerce(value),
            None => value.normalized(),
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Immutable registry of resolved record types, keyed by type name
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    models: BTreeMap<String, Arc<ModelDef>>,
}

impl Catalog {
    /// Start registering schemas
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Look up a model by type name
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownModel` if no such type is registered.
    pub fn get(&self, name: &str) -> Result<Arc<ModelDef>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownModel(name.to_string()))
    }

    /// Registered type names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Check if no types are registered
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Distinct physical collections
    pub fn collections(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.values().map(|m| m.collection()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Pick the concrete type for a stored document queried as `queried`
    ///
    /// Non-polymorphic families always hydrate as `queried`. Otherwise the
    /// stored `_type` selects the type; a missing `_type` keeps `queried`,
    /// and an unknown or foreign `_type` falls back to the family root.
    pub fn resolve(&self, queried: &Arc<ModelDef>, document: &Document) -> Arc<ModelDef> {
        if !queried.is_polymorphic() {
            return Arc::clone(queried);
        }
        let Some(type_name) = document.get(TYPE_KEY).and_then(Value::as_str) else {
            return Arc::clone(queried);
        };
        if type_name == queried.name() {
            return Arc::clone(queried);
        }
        match self.models.get(type_name) {
            Some(def) if def.root() == queried.root() => Arc::clone(def),
            _ => {
                warn!(
                    target: "docmap::catalog",
                    discriminator = type_name,
                    family = queried.root(),
                    "Unknown discriminator, hydrating as family root"
                );
                self.models
                    .get(queried.root())
                    .cloned()
                    .unwrap_or_else(|| Arc::clone(queried))
            }
        }
    }
}

/// Collects schemas and resolves them into a [`Catalog`]
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    schemas: Vec<Schema>,
}

impl CatalogBuilder {
    /// Add a document or subtype schema
    pub fn register(mut self, schema: Schema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Resolve every registered schema
    ///
    /// # Errors
    ///
    /// - `InvalidArguments` for duplicate names, embedded schemas or
    ///   inheritance cycles
    /// - `UnknownModel` for a missing parent or association target
    pub fn build(self) -> Result<Catalog> {
        let mut by_name: BTreeMap<&str, &Schema> = BTreeMap::new();
        for schema in &self.schemas {
            if matches!(schema.kind(), SchemaKind::Embedded) {
                return Err(Error::InvalidArguments(format!(
                    "embedded schema '{}' cannot be registered as a model",
                    schema.name()
                )));
            }
            if by_name.insert(schema.name(), schema).is_some() {
                return Err(Error::InvalidArguments(format!(
                    "model '{}' registered twice",
                    schema.name()
                )));
            }
        }

        // Inheritance chains, root first
        let mut chains: BTreeMap<&str, Vec<&Schema>> = BTreeMap::new();
        for schema in &self.schemas {
            chains.insert(schema.name(), chain_of(schema, &by_name)?);
        }

        // A root is polymorphic when declared so or when it has subtypes
        let mut polymorphic_roots: Vec<&str> = Vec::new();
        for chain in chains.values() {
            let root = chain[0];
            if (root.is_polymorphic() || chain.len() > 1) && !polymorphic_roots.contains(&root.name()) {
                polymorphic_roots.push(root.name());
            }
        }

        // Foreign keys contributed to target roots by has_many declarations
        let mut foreign_keys: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for schema in &self.schemas {
            for assoc in schema.associations() {
                let target_chain = chains
                    .get(assoc.target())
                    .ok_or_else(|| Error::UnknownModel(assoc.target().to_string()))?;
                let target_root = target_chain[0].name();
                let fk = assoc.foreign_key_for(schema.name());
                let slot = foreign_keys.entry(target_root).or_default();
                if !slot.contains(&fk) {
                    slot.push(fk);
                }
            }
        }

        let mut models = BTreeMap::new();
        for (name, chain) in &chains {
            let root = chain[0];
            let polymorphic = polymorphic_roots.contains(&root.name());
            let def = resolve_model(name, chain, polymorphic, foreign_keys.get(root.name()));
            models.insert(name.to_string(), Arc::new(def));
        }
        Ok(Catalog { models })
    }
}

fn chain_of<'a>(schema: &'a Schema, by_name: &BTreeMap<&str, &'a Schema>) -> Result<Vec<&'a Schema>> {
    let mut chain = vec![schema];
    let mut current = schema;
    while let SchemaKind::Subtype { parent } = current.kind() {
        let next = by_name
            .get(parent.as_str())
            .copied()
            .ok_or_else(|| Error::UnknownModel(parent.clone()))?;
        if chain.iter().any(|s| s.name() == next.name()) {
            return Err(Error::InvalidArguments(format!(
                "inheritance cycle through '{}'",
                next.name()
            )));
        }
        chain.push(next);
        current = next;
    }
    chain.reverse();
    Ok(chain)
}

fn resolve_model(
    name: &str,
    chain: &[&Schema],
    polymorphic: bool,
    foreign_keys: Option<&Vec<String>>,
) -> ModelDef {
    let root = chain[0];
    let collection = match root.kind() {
        SchemaKind::Document {
            collection: Some(collection),
        } => collection.clone(),
        _ => collection_name_for(root.name()),
    };

    let mut keys: Vec<KeyDef> = Vec::new();
    let mut push_key = |def: KeyDef| match keys.iter_mut().find(|k| k.name() == def.name()) {
        Some(existing) => *existing = def,
        None => keys.push(def),
    };

    if polymorphic {
        push_key(KeyDef::new(TYPE_KEY, KeyType::String));
    }
    for fk in foreign_keys.into_iter().flatten() {
        push_key(KeyDef::new(fk.as_str(), KeyType::ObjectId));
    }
    for schema in chain {
        for def in schema.keys() {
            push_key(def.clone());
        }
    }
    push_key(KeyDef::new(CREATED_AT, KeyType::Time));
    push_key(KeyDef::new(UPDATED_AT, KeyType::Time));

    let default_order = chain
        .iter()
        .rev()
        .find_map(|s| s.default_order_clause())
        .map(str::to_string);

    let associations = chain
        .iter()
        .flat_map(|schema| {
            schema.associations().iter().map(move |assoc| AssociationDef {
                name: assoc.name().to_string(),
                target: assoc.target().to_string(),
                foreign_key: assoc.foreign_key_for(schema.name()),
            })
        })
        .collect();

    ModelDef {
        name: name.to_string(),
        root: root.name().to_string(),
        collection,
        keys,
        polymorphic,
        default_order,
        associations,
    }
}
