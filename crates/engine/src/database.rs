//! Database handle
//!
//! A `Database` ties together:
//! - the storage driver (`Arc<dyn Driver>`)
//! - the resolved [`Catalog`] of record types
//! - the [`MapperConfig`]
//!
//! It is cheap to clone (one `Arc`) and every [`Model`] and
//! [`Record`](crate::Record) carries a clone. Binding a model for the first
//! time creates indexes for its `indexed` keys when `auto_index` is on.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use docmap_core::{Document, Driver, IndexOptions, IndexSpec, Result};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::config::MapperConfig;
use crate::model::Model;

struct DatabaseInner {
    driver: Arc<dyn Driver>,
    catalog: Catalog,
    config: MapperConfig,
    /// Models whose indexed keys have been ensured
    bound: Mutex<HashSet<String>>,
}

/// Entry point: a driver plus the record types mapped onto it
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Create a database with the default configuration
    pub fn new(driver: Arc<dyn Driver>, catalog: Catalog) -> Self {
        Self::from_parts(driver, catalog, MapperConfig::default())
    }

    /// Create a database with an explicit configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration fails validation.
    pub fn with_config(driver: Arc<dyn Driver>, catalog: Catalog, config: MapperConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(driver, catalog, config))
    }

    fn from_parts(driver: Arc<dyn Driver>, catalog: Catalog, config: MapperConfig) -> Self {
        info!(
            target: "docmap::database",
            models = catalog.len(),
            auto_index = config.auto_index,
            timestamps = config.timestamps,
            "Database opened"
        );
        Self {
            inner: Arc::new(DatabaseInner {
                driver,
                catalog,
                config,
                bound: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// The storage driver
    pub fn driver(&self) -> &dyn Driver {
        self.inner.driver.as_ref()
    }

    /// The resolved record types
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// The active configuration
    pub fn config(&self) -> &MapperConfig {
        &self.inner.config
    }

    /// Class-level handle for a registered record type
    ///
    /// The first call for a type ensures indexes for its `indexed` keys
    /// (when `auto_index` is on).
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownModel` for an unregistered name, or a driver
    /// error if index creation fails.
    pub fn model(&self, name: &str) -> Result<Model> {
        let def = self.inner.catalog.get(name)?;
        self.bind(&def)?;
        Ok(Model::new(self.clone(), def))
    }

    fn bind(&self, def: &crate::catalog::ModelDef) -> Result<()> {
        let mut bound = self.inner.bound.lock();
        if bound.contains(def.name()) {
            return Ok(());
        }
        if self.inner.config.auto_index {
            for key in def.indexed_keys() {
                let name = self.inner.driver.ensure_index(
                    def.collection(),
                    &IndexSpec::single(key.name()),
                    &IndexOptions::default(),
                )?;
                debug!(
                    target: "docmap::database",
                    model = def.name(),
                    index = %name,
                    "Ensured index for indexed key"
                );
            }
        }
        bound.insert(def.name().to_string());
        Ok(())
    }

    /// Names of every collection the driver knows about
    pub fn collection_names(&self) -> Result<Vec<String>> {
        Ok(self.inner.driver.collection_names()?)
    }

    /// Remove every document from every collection, keeping indexes
    pub fn clear_all_collections(&self) -> Result<()> {
        for name in self.inner.driver.collection_names()? {
            let removed = self.inner.driver.remove(&name, &Document::new())?;
            debug!(target: "docmap::database", collection = %name, removed, "Cleared collection");
        }
        Ok(())
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("models", &self.inner.catalog.names().collect::<Vec<_>>())
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{KeyDef, KeyType, Schema};
    use docmap_core::{doc, Error};
    use docmap_storage::MemoryDriver;

    fn catalog() -> Catalog {
        Catalog::builder()
            .register(
                Schema::document("User")
                    .collection("users")
                    .key("first_name", KeyType::String)
                    .key_def(KeyDef::new("father", KeyType::String).indexed(true)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_unknown_model() {
        let db = Database::new(Arc::new(MemoryDriver::new()), catalog());
        assert!(matches!(db.model("Nope"), Err(Error::UnknownModel(_))));
    }

    #[test]
    fn test_indexed_key_ensured_on_first_bind() {
        let driver = Arc::new(MemoryDriver::new());
        let db = Database::new(driver.clone(), catalog());
        db.model("User").unwrap();
        let info = driver.index_information("users").unwrap();
        assert!(info.contains_key("father_1"));

        // Binding again does not add anything
        db.model("User").unwrap();
        assert_eq!(driver.index_information("users").unwrap().len(), 2);
    }

    #[test]
    fn test_auto_index_disabled() {
        let driver = Arc::new(MemoryDriver::new());
        let config = MapperConfig {
            auto_index: false,
            ..MapperConfig::default()
        };
        let db = Database::with_config(driver.clone(), catalog(), config).unwrap();
        db.model("User").unwrap();
        assert_eq!(driver.index_information("users").unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MapperConfig {
            default_per_page: 0,
            ..MapperConfig::default()
        };
        let result = Database::with_config(Arc::new(MemoryDriver::new()), catalog(), config);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_clear_all_collections_keeps_indexes() {
        let driver = Arc::new(MemoryDriver::new());
        let db = Database::new(driver.clone(), catalog());
        driver.insert("users", doc! { "first_name" => "John" }).unwrap();
        driver.insert("rooms", doc! { "name" => "Lounge" }).unwrap();
        db.model("User").unwrap();

        db.clear_all_collections().unwrap();
        assert_eq!(driver.document_count(), 0);
        assert_eq!(driver.index_information("users").unwrap().len(), 2);
        assert_eq!(db.collection_names().unwrap(), vec!["rooms".to_string(), "users".to_string()]);
    }
}
