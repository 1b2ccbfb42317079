//! Registration settings for ring enforcement.
//!
//! A [`RingConfig`] names the configuration collection whose records declare
//! rings, and the two fields of those records that hold the target
//! collection and its capacity. Settings come from defaults, an optional JSON
//! file, and `RINGSTORE_*` environment overrides, in that order.

#![warn(missing_docs, clippy::pedantic)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable overriding [`RingConfig::config_collection`].
pub const CONFIG_COLLECTION_ENV: &str = "RINGSTORE_CONFIG_COLLECTION";
/// Environment variable overriding [`RingConfig::target_field`].
pub const TARGET_FIELD_ENV: &str = "RINGSTORE_TARGET_FIELD";
/// Environment variable overriding [`RingConfig::capacity_field`].
pub const CAPACITY_FIELD_ENV: &str = "RINGSTORE_CAPACITY_FIELD";

const DEFAULT_CONFIG_COLLECTION: &str = "rings";
const DEFAULT_TARGET_FIELD: &str = "collection";
const DEFAULT_CAPACITY_FIELD: &str = "size";

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating a [`RingConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read ring config `{}`: {source}", .path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration document was not valid JSON for this schema.
    #[error("malformed ring config: {0}")]
    Parse(#[from] serde_json::Error),
    /// The settings were structurally valid but unusable.
    #[error("invalid ring config: {0}")]
    Invalid(&'static str),
}

/// Names the configuration collection and the fields ring specs are read
/// from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RingConfig {
    config_collection: String,
    target_field: String,
    capacity_field: String,
}

impl RingConfig {
    /// Creates a configuration from explicit names.
    #[must_use]
    pub fn new(
        config_collection: impl Into<String>,
        target_field: impl Into<String>,
        capacity_field: impl Into<String>,
    ) -> Self {
        Self {
            config_collection: config_collection.into(),
            target_field: target_field.into(),
            capacity_field: capacity_field.into(),
        }
    }

    /// Parses a JSON document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown keys.
    pub fn from_json_str(document: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(document)?)
    }

    /// Reads and parses a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Parse`] when its contents do not parse.
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let document = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded ring config file");
        Self::from_json_str(&document)
    }

    /// Applies `RINGSTORE_*` overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup. Blank values are
    /// ignored.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let fields = [
            (CONFIG_COLLECTION_ENV, &mut self.config_collection),
            (TARGET_FIELD_ENV, &mut self.target_field),
            (CAPACITY_FIELD_ENV, &mut self.capacity_field),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|value| !value.trim().is_empty()) {
                debug!(key, %value, "ring config override");
                *field = value;
            }
        }
        self
    }

    /// Returns the name of the collection holding ring specs.
    #[must_use]
    pub fn config_collection(&self) -> &str {
        &self.config_collection
    }

    /// Returns the spec field naming the target collection.
    #[must_use]
    pub fn target_field(&self) -> &str {
        &self.target_field
    }

    /// Returns the spec field holding the ring capacity.
    #[must_use]
    pub fn capacity_field(&self) -> &str {
        &self.capacity_field
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a name is blank or both spec
    /// fields name the same column.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.config_collection.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "config collection name cannot be empty",
            ));
        }
        if self.target_field.trim().is_empty() {
            return Err(ConfigError::Invalid("target field name cannot be empty"));
        }
        if self.capacity_field.trim().is_empty() {
            return Err(ConfigError::Invalid("capacity field name cannot be empty"));
        }
        if self.target_field == self.capacity_field {
            return Err(ConfigError::Invalid(
                "target and capacity fields must differ",
            ));
        }
        Ok(())
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_CONFIG_COLLECTION,
            DEFAULT_TARGET_FIELD,
            DEFAULT_CAPACITY_FIELD,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = RingConfig::default();
        assert_eq!(config.config_collection(), "rings");
        assert_eq!(config.target_field(), "collection");
        assert_eq!(config.capacity_field(), "size");
        config.validate().unwrap();
    }

    #[test]
    fn partial_documents_keep_defaults() {
        let config = RingConfig::from_json_str(r#"{"capacity_field": "max_rows"}"#).unwrap();
        assert_eq!(config.config_collection(), "rings");
        assert_eq!(config.capacity_field(), "max_rows");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = RingConfig::from_json_str(r#"{"colection": "x"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn validation_rejects_unusable_names() {
        let blank = RingConfig::new(" ", "collection", "size");
        assert!(matches!(blank.validate(), Err(ConfigError::Invalid(_))));

        let clash = RingConfig::new("rings", "size", "size");
        let err = clash.validate().unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn overrides_replace_non_blank_values() {
        let vars: HashMap<&str, &str> = [
            (CONFIG_COLLECTION_ENV, "buffers"),
            (TARGET_FIELD_ENV, "   "),
        ]
        .into_iter()
        .collect();

        let config = RingConfig::default()
            .with_overrides(|key| vars.get(key).map(|value| (*value).to_owned()));
        assert_eq!(config.config_collection(), "buffers");
        assert_eq!(config.target_field(), "collection");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = RingConfig::from_json_file("/nonexistent/ringstore.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/ringstore.json"));
    }
}
