//! Query translator
//!
//! Turns symbolic find options into a [`NativeQuery`] for the driver.
//!
//! ## Conditions
//!
//! - `field => value` means equality
//! - `field => [a, b]` means "any of" (`$in`), unless the field is declared
//!   `Array`, where an array value is compared as a whole
//! - `field => { "$op" => .. }` passes through untouched
//! - `id` is an alias for `_id`
//! - values for declared scalar keys are coerced like assignments, so
//!   `age => "27"` finds the record saved with `age = 27`
//!
//! ## Order
//!
//! `"field [asc|desc], field [asc|desc]"`, direction case-insensitive and
//! ascending by default. The natural order token (`$natural` by default)
//! selects insertion order. An empty order falls back to the model's
//! default order, else to the driver's natural order.

use docmap_core::{
    normalize_key, Document, Error, NativeQuery, Result, SortDirection, SortKey, Value, ID_FIELD,
};
use tracing::debug;

use crate::catalog::ModelDef;
use crate::config::MapperConfig;
use crate::schema::{KeyType, TYPE_KEY};

/// Which boundary of a result set a finder returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Every matching record
    All,
    /// The first record in the requested order
    First,
    /// The last record in the requested order
    Last,
}

/// Conditions, order and window of a find
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Field conditions, conjoined
    pub conditions: Document,
    /// Order clause, e.g. `"last_name asc, age desc"`
    pub order: Option<String>,
    /// Maximum number of records
    pub limit: Option<usize>,
    /// Number of records to skip
    pub offset: Option<usize>,
}

impl FindOptions {
    /// Options matching everything in default order
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the conditions
    pub fn conditions(mut self, conditions: Document) -> Self {
        self.conditions = conditions;
        self
    }

    /// Set the order clause
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Set the limit
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the offset
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl From<Document> for FindOptions {
    fn from(conditions: Document) -> Self {
        FindOptions::new().conditions(conditions)
    }
}

/// Parse an order clause into sort keys
///
/// `natural_token` names the pseudo-field that selects insertion order.
///
/// # Errors
///
/// Returns `Error::InvalidArguments` for an empty field or an unknown
/// direction word.
pub fn parse_order(order: &str, natural_token: &str) -> Result<Vec<SortKey>> {
    let mut keys = Vec::new();
    for clause in order.split(',') {
        let clause = clause.trim();
        if clause.is_empty() {
            continue;
        }
        let mut words = clause.split_whitespace();
        let field = words.next().unwrap_or_default();
        let direction = match words.next() {
            None => SortDirection::Ascending,
            Some(word) => SortDirection::parse(word).ok_or_else(|| {
                Error::InvalidArguments(format!(
                    "invalid sort direction '{}' in order '{}'",
                    word, order
                ))
            })?,
        };
        if let Some(extra) = words.next() {
            return Err(Error::InvalidArguments(format!(
                "unexpected '{}' in order '{}'",
                extra, order
            )));
        }
        let field = normalize_key(field);
        keys.push(if field == natural_token {
            SortKey::Natural(direction)
        } else if field == "id" {
            SortKey::Field {
                field: ID_FIELD.to_string(),
                direction,
            }
        } else {
            SortKey::Field {
                field: field.to_string(),
                direction,
            }
        });
    }
    Ok(keys)
}

/// Translates find options for one model
#[derive(Debug, Clone, Copy)]
pub struct QueryTranslator<'a> {
    def: &'a ModelDef,
    config: &'a MapperConfig,
}

impl<'a> QueryTranslator<'a> {
    /// Translator for `def` under `config`
    pub fn new(def: &'a ModelDef, config: &'a MapperConfig) -> Self {
        Self { def, config }
    }

    /// Conditions that restrict a query to this model
    ///
    /// Subtypes only see documents whose `_type` is their own name.
    pub fn base_scope(&self) -> Document {
        let mut scope = Document::new();
        if self.def.is_subtype() {
            scope.insert(TYPE_KEY.to_string(), Value::from(self.def.name()));
        }
        scope
    }

    /// Translate conditions into a native filter
    pub fn filter(&self, conditions: &Document) -> Document {
        conditions
            .iter()
            .map(|(field, value)| {
                let field = match normalize_key(field) {
                    "id" => ID_FIELD,
                    other => other,
                };
                (field.to_string(), self.condition(field, value.clone()))
            })
            .collect()
    }

    fn condition(&self, field: &str, value: Value) -> Value {
        let key_type = if field == ID_FIELD {
            Some(&KeyType::ObjectId)
        } else {
            self.def.key(field).map(|k| k.key_type())
        };
        match value {
            Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => {
                Value::Object(ops)
            }
            Value::Array(items) if !matches!(key_type, Some(KeyType::Array)) => {
                let items = items
                    .into_iter()
                    .map(|item| coerce_condition(key_type, item))
                    .collect();
                let mut op = Document::new();
                op.insert("$in".to_string(), Value::Array(items));
                Value::Object(op)
            }
            other => coerce_condition(key_type, other),
        }
    }

    /// Translate an order clause, falling back to the model default
    pub fn sort(&self, order: Option<&str>) -> Result<Vec<SortKey>> {
        let clause = match order.map(str::trim) {
            Some(clause) if !clause.is_empty() => clause,
            _ => match self.def.default_order() {
                Some(default) => default,
                None => return Ok(Vec::new()),
            },
        };
        parse_order(clause, &self.config.natural_order_token)
    }

    /// Translate a full find, conjoining `scope` with the conditions
    ///
    /// Scope entries win over conditions on the same field.
    pub fn translate(&self, scope: &Document, options: &FindOptions) -> Result<NativeQuery> {
        let mut filter = self.filter(&options.conditions);
        for (field, value) in scope {
            filter.insert(field.clone(), value.clone());
        }
        let mut query = NativeQuery::new(filter).with_sort(self.sort(options.order.as_deref())?);
        query.limit = options.limit;
        query.skip = options.offset;

        debug!(
            target: "docmap::query",
            collection = self.def.collection(),
            model = self.def.name(),
            filter = ?query.filter,
            sort = ?query.sort,
            limit = ?query.limit,
            skip = ?query.skip,
            "Translated query"
        );
        Ok(query)
    }

    /// Sort keys for `last`: the requested order reversed, or natural
    /// descending when nothing is ordered
    ///
    /// The driver breaks ties in ascending natural order, so that tie-break
    /// is made explicit before reversing.
    pub fn reversed_sort(&self, order: Option<&str>) -> Result<Vec<SortKey>> {
        let mut sort = self.sort(order)?;
        if sort.is_empty() {
            return Ok(vec![SortKey::Natural(SortDirection::Descending)]);
        }
        if !sort.iter().any(|key| matches!(key, SortKey::Natural(_))) {
            sort.push(SortKey::Natural(SortDirection::Ascending));
        }
        Ok(sort.iter().map(SortKey::reversed).collect())
    }
}

fn coerce_condition(key_type: Option<&KeyType>, value: Value) -> Value {
    match key_type {
        Some(key_type) if key_type.is_scalar() && !value.is_null() => {
            match crate::schema::coerce(key_type, value.clone()) {
                // Leave uncoercible values as given rather than matching on null
                Value::Null => value,
                coerced => coerced,
            }
        }
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::schema::Schema;
    use docmap_core::{doc, ObjectId};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn users() -> Arc<ModelDef> {
        Catalog::builder()
            .register(
                Schema::document("User")
                    .key("first_name", KeyType::String)
                    .key("age", KeyType::Integer)
                    .key("tags", KeyType::Array),
            )
            .build()
            .unwrap()
            .get("User")
            .unwrap()
    }

    #[test]
    fn test_parse_order_directions() {
        let keys = parse_order("last_name, age DESC, first_name asc", "$natural").unwrap();
        assert_eq!(
            keys,
            vec![
                SortKey::asc("last_name"),
                SortKey::desc("age"),
                SortKey::asc("first_name")
            ]
        );
    }

    #[test]
    fn test_parse_order_natural_token() {
        let keys = parse_order("$natural desc", "$natural").unwrap();
        assert_eq!(keys, vec![SortKey::Natural(SortDirection::Descending)]);
    }

    #[test]
    fn test_parse_order_rejects_garbage() {
        assert!(matches!(
            parse_order("age sideways", "$natural"),
            Err(Error::InvalidArguments(_))
        ));
        assert!(parse_order("age asc extra", "$natural").is_err());
        assert!(parse_order("", "$natural").unwrap().is_empty());
    }

    #[test]
    fn test_array_condition_becomes_in() {
        let def = users();
        let config = MapperConfig::default();
        let filter = QueryTranslator::new(&def, &config).filter(&doc! { "age" => vec![26, 27] });
        assert_eq!(filter, doc! { "age" => doc! { "$in" => vec![26, 27] } });
    }

    #[test]
    fn test_array_typed_field_compares_whole_array() {
        let def = users();
        let config = MapperConfig::default();
        let filter = QueryTranslator::new(&def, &config).filter(&doc! { "tags" => vec!["a", "b"] });
        assert_eq!(filter, doc! { "tags" => vec!["a", "b"] });
    }

    #[test]
    fn test_conditions_are_coerced() {
        let def = users();
        let config = MapperConfig::default();
        let translator = QueryTranslator::new(&def, &config);
        assert_eq!(translator.filter(&doc! { "age" => "27" }), doc! { "age" => 27 });
        assert_eq!(
            translator.filter(&doc! { "age" => vec!["26", "27"] }),
            doc! { "age" => doc! { "$in" => vec![26, 27] } }
        );
    }

    #[test]
    fn test_id_alias_and_hex_coercion() {
        let def = users();
        let config = MapperConfig::default();
        let id = ObjectId::new();
        let filter = QueryTranslator::new(&def, &config).filter(&doc! { "id" => id.to_hex() });
        assert_eq!(filter, doc! { "_id" => id });
    }

    #[test]
    fn test_operator_objects_pass_through() {
        let def = users();
        let config = MapperConfig::default();
        let conditions = doc! { "age" => doc! { "$gt" => 20 } };
        assert_eq!(QueryTranslator::new(&def, &config).filter(&conditions), conditions);
    }

    #[test]
    fn test_scope_wins_and_window_applies() {
        let def = users();
        let config = MapperConfig::default();
        let options = FindOptions::new()
            .conditions(doc! { "first_name" => "John" })
            .order("age desc")
            .limit(2)
            .offset(1);
        let query = QueryTranslator::new(&def, &config)
            .translate(&doc! { "first_name" => "Steve" }, &options)
            .unwrap();
        assert_eq!(query.filter, doc! { "first_name" => "Steve" });
        assert_eq!(query.sort, vec![SortKey::desc("age")]);
        assert_eq!(query.limit, Some(2));
        assert_eq!(query.skip, Some(1));
    }

    #[test]
    fn test_default_order_and_reversal() {
        let def = Catalog::builder()
            .register(Schema::document("Message").default_order("position asc"))
            .build()
            .unwrap()
            .get("Message")
            .unwrap();
        let config = MapperConfig::default();
        let translator = QueryTranslator::new(&def, &config);
        assert_eq!(translator.sort(None).unwrap(), vec![SortKey::asc("position")]);
        assert_eq!(translator.sort(Some("  ")).unwrap(), vec![SortKey::asc("position")]);
        assert_eq!(
            translator.reversed_sort(None).unwrap(),
            vec![SortKey::desc("position"), SortKey::Natural(SortDirection::Descending)]
        );
    }

    #[test]
    fn test_reversed_sort_keeps_explicit_natural_key() {
        let def = users();
        let config = MapperConfig::default();
        assert_eq!(
            QueryTranslator::new(&def, &config)
                .reversed_sort(Some("age desc, $natural asc"))
                .unwrap(),
            vec![SortKey::asc("age"), SortKey::Natural(SortDirection::Descending)]
        );
    }

    #[test]
    fn test_reversed_sort_without_order_is_natural_desc() {
        let def = users();
        let config = MapperConfig::default();
        assert_eq!(
            QueryTranslator::new(&def, &config).reversed_sort(None).unwrap(),
            vec![SortKey::Natural(SortDirection::Descending)]
        );
    }

    #[test]
    fn test_subtype_scope_filters_type() {
        let catalog = Catalog::builder()
            .register(Schema::document("Message").polymorphic())
            .register(Schema::subtype("Enter", "Message"))
            .build()
            .unwrap();
        let config = MapperConfig::default();
        let enter = catalog.get("Enter").unwrap();
        assert_eq!(QueryTranslator::new(&enter, &config).base_scope(), doc! { "_type" => "Enter" });
        let message = catalog.get("Message").unwrap();
        assert!(QueryTranslator::new(&message, &config).base_scope().is_empty());
    }

    proptest! {
        #[test]
        fn prop_order_round_trips(fields in proptest::collection::vec(("[a-z_]{1,12}", any::<bool>()), 1..5)) {
            let clause = fields
                .iter()
                .map(|(f, asc)| format!("{} {}", f, if *asc { "ASC" } else { "desc" }))
                .collect::<Vec<_>>()
                .join(", ");
            let keys = parse_order(&clause, "$natural").unwrap();
            prop_assert_eq!(keys.len(), fields.len());
            for (key, (field, asc)) in keys.iter().zip(fields.iter()) {
                let expected_field = if field == "id" { "_id" } else { field.as_str() };
                let expected = if *asc {
                    SortKey::asc(expected_field)
                } else {
                    SortKey::desc(expected_field)
                };
                prop_assert_eq!(key, &expected);
            }
        }
    }
}
