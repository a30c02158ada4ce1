//! Import configuration
//!
//! # Example
//!
//! ```yaml
//! software_version: "9.0.0"
//! ignored_parameters: [parallelize_main_process]
//! accept_legacy_layout: true
//! ```

use procflow_model::{VersionNumber, DEFAULT_VERSION};
use procflow_registry::{ROOT_KEY, SOFTWARE_VERSION};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Text is not a valid configuration
    #[error("invalid import configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration file could not be read
    #[error("io error reading configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Import settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Running software version; the fallback declared version of fragments
    pub software_version: VersionNumber,
    /// Type key the outermost operator must resolve to
    pub root_key: String,
    /// Undeclared parameter keys dropped without a diagnostic
    pub ignored_parameters: Vec<String>,
    /// Whether pre-5.0 direct nesting is accepted
    pub accept_legacy_layout: bool,
    /// Version assumed when the document version is missing or invalid
    pub default_document_version: VersionNumber,
    /// Largest document read from disk, in bytes
    pub max_document_bytes: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            software_version: SOFTWARE_VERSION,
            root_key: ROOT_KEY.to_string(),
            ignored_parameters: vec![
                "parallelize_main_process".to_string(),
                "parallelize_nested_chain".to_string(),
                "parallelize_execution".to_string(),
            ],
            accept_legacy_layout: true,
            default_document_version: DEFAULT_VERSION,
            max_document_bytes: 64 * 1024 * 1024,
        }
    }
}

impl ImportConfig {
    /// Parse configuration YAML; missing fields keep their defaults
    ///
    /// # Errors
    /// Returns error if the text is not valid configuration.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read configuration from a file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    #[inline]
    #[must_use]
    pub fn with_software_version(mut self, version: VersionNumber) -> Self {
        self.software_version = version;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_root_key(mut self, key: impl Into<String>) -> Self {
        self.root_key = key.into();
        self
    }

    /// Add a parameter key dropped without diagnostic
    #[inline]
    #[must_use]
    pub fn with_ignored_parameter(mut self, key: impl Into<String>) -> Self {
        self.ignored_parameters.push(key.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_legacy_layout(mut self, accept: bool) -> Self {
        self.accept_legacy_layout = accept;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_default_document_version(mut self, version: VersionNumber) -> Self {
        self.default_document_version = version;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_document_bytes(mut self, bytes: usize) -> Self {
        self.max_document_bytes = bytes;
        self
    }

    /// Whether `key` is dropped silently when undeclared
    #[inline]
    #[must_use]
    pub fn is_ignored_parameter(&self, key: &str) -> bool {
        self.ignored_parameters.iter().any(|k| k == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = ImportConfig::from_yaml("software_version: '9.4.1'\naccept_legacy_layout: false\n").unwrap();
        assert_eq!(config.software_version, VersionNumber::new(9, 4, 1));
        assert!(!config.accept_legacy_layout);
        assert_eq!(config.root_key, ROOT_KEY);
        assert!(config.is_ignored_parameter("parallelize_main_process"));
    }

    #[test]
    fn builder() {
        let config = ImportConfig::default()
            .with_ignored_parameter("legacy_flag")
            .with_default_document_version(VersionNumber::new(4, 0, 0));
        assert!(config.is_ignored_parameter("legacy_flag"));
        assert_eq!(config.default_document_version, VersionNumber::new(4, 0, 0));
    }
}
