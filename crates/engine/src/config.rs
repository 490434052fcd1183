//! Mapper configuration via `docmap.toml`
//!
//! Every setting has a default, so an empty file (or no file at all) yields
//! the stock behaviour. Values are validated eagerly on load.

use docmap_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name conventionally placed next to the application's data.
pub const CONFIG_FILE_NAME: &str = "docmap.toml";

/// Mapper configuration loaded from `docmap.toml`.
///
/// # Example
///
/// ```toml
/// default_per_page = 30
/// auto_index = true
/// timestamps = true
/// natural_order_token = "$natural"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Page size used by `paginate` when `per_page` is not given.
    #[serde(default = "default_per_page")]
    pub default_per_page: usize,
    /// Create indexes for keys declared `indexed` when a model is first bound.
    #[serde(default = "default_true")]
    pub auto_index: bool,
    /// Maintain `created_at` / `updated_at` on save.
    #[serde(default = "default_true")]
    pub timestamps: bool,
    /// Order-clause field name that selects storage-native insertion order.
    #[serde(default = "default_natural_order_token")]
    pub natural_order_token: String,
}

fn default_per_page() -> usize {
    30
}

fn default_true() -> bool {
    true
}

fn default_natural_order_token() -> String {
    "$natural".to_string()
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            default_per_page: default_per_page(),
            auto_index: true,
            timestamps: true,
            natural_order_token: default_natural_order_token(),
        }
    }
}

impl MapperConfig {
    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for a zero page size or an empty or
    /// whitespace-containing natural order token.
    pub fn validate(&self) -> Result<()> {
        if self.default_per_page == 0 {
            return Err(Error::Config(
                "default_per_page must be greater than zero".to_string(),
            ));
        }
        let token = self.natural_order_token.as_str();
        if token.is_empty() || token.chars().any(char::is_whitespace) || token.contains(',') {
            return Err(Error::Config(format!(
                "Invalid natural_order_token '{}': must be a single non-empty word",
                token
            )));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# docmap configuration
#
# Page size used by paginate when per_page is omitted (default: 30)
default_per_page = 30

# Create indexes for keys declared indexed when a model is first used (default: true)
auto_index = true

# Maintain created_at / updated_at on save (default: true)
timestamps = true

# Order-clause token selecting insertion order, e.g. "$natural desc"
natural_order_token = "$natural"
"#
    }

    /// Parse and validate config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the text does not parse or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MapperConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{} ({})", msg, path.display())),
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
