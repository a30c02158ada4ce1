//! Operator type registry
//!
//! Provides [`OperatorRegistry`], the mapping from type key to descriptor and
//! factory, together with the table of deprecated keys and their
//! replacements.

use crate::descriptor::{OperatorDescriptor, SubprocessSpec};
use crate::error::{RegistryError, RegistryResult};
use crate::factory::{DescriptorFactory, OperatorFactory};
use indexmap::IndexMap;
use procflow_model::{Operator, OperatorId, VersionNumber};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Key of the designated root type
pub const ROOT_KEY: &str = "process";

/// Name of the root type's single execution unit
pub const ROOT_UNIT: &str = "Main Process";

/// Descriptor of the root type at software version `latest`
#[must_use]
pub fn root_descriptor(latest: VersionNumber) -> OperatorDescriptor {
    OperatorDescriptor::new(ROOT_KEY, latest).with_subprocess(SubprocessSpec::extending(ROOT_UNIT, "input", "result"))
}

/// Registered operator type
pub struct OperatorType {
    descriptor: OperatorDescriptor,
    factory: Arc<dyn OperatorFactory>,
}

impl OperatorType {
    /// Type descriptor
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &OperatorDescriptor {
        &self.descriptor
    }

    /// Type key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.descriptor.key
    }

    /// Create a fresh instance
    #[must_use]
    pub fn instantiate(&self, id: OperatorId, name: &str) -> Operator {
        self.factory.instantiate(&self.descriptor, id, name)
    }
}

impl fmt::Debug for OperatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorType")
            .field("key", &self.descriptor.key)
            .field("latest_version", &self.descriptor.latest_version)
            .finish_non_exhaustive()
    }
}

/// Outcome of resolving a document key through the replacement table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    /// Key to instantiate
    pub key: String,
    /// Deprecated key the document used, if it was replaced
    pub replaced_from: Option<String>,
}

/// YAML catalog of operator types
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Operator type descriptors
    #[serde(default)]
    pub operators: Vec<OperatorDescriptor>,
    /// Deprecated key → replacement key
    #[serde(default)]
    pub replacements: IndexMap<String, String>,
}

impl Catalog {
    /// Parse catalog YAML
    ///
    /// # Errors
    /// Returns error if the text is not a valid catalog.
    pub fn from_yaml(text: &str) -> RegistryResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Mapping from type key to operator type
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    types: HashMap<String, Arc<OperatorType>>,
    replacements: HashMap<String, String>,
}

impl OperatorRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry containing only the root type
    #[must_use]
    pub fn with_root(software_version: VersionNumber) -> Self {
        let mut registry = Self::new();
        registry.insert(root_descriptor(software_version), Arc::new(DescriptorFactory));
        registry
    }

    /// Register a type built by [`DescriptorFactory`]
    ///
    /// # Errors
    /// Returns error if the key is already registered.
    pub fn register(&mut self, descriptor: OperatorDescriptor) -> RegistryResult<()> {
        self.register_with_factory(descriptor, DescriptorFactory)
    }

    /// Register a type with a custom factory
    ///
    /// # Errors
    /// Returns error if the key is already registered.
    pub fn register_with_factory(
        &mut self,
        descriptor: OperatorDescriptor,
        factory: impl OperatorFactory + 'static,
    ) -> RegistryResult<()> {
        if self.types.contains_key(&descriptor.key) {
            return Err(RegistryError::DuplicateType(descriptor.key));
        }
        self.insert(descriptor, Arc::new(factory));
        Ok(())
    }

    fn insert(&mut self, descriptor: OperatorDescriptor, factory: Arc<dyn OperatorFactory>) {
        debug!(key = %descriptor.key, version = %descriptor.latest_version, "registered operator type");
        self.types.insert(
            descriptor.key.clone(),
            Arc::new(OperatorType {
                descriptor,
                factory,
            }),
        );
    }

    /// Record that `deprecated` documents should load as `replacement`
    pub fn add_replacement(&mut self, deprecated: impl Into<String>, replacement: impl Into<String>) {
        self.replacements.insert(deprecated.into(), replacement.into());
    }

    /// Look up a type
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Arc<OperatorType>> {
        self.types.get(key)
    }

    /// Look up a type, failing if unknown
    ///
    /// # Errors
    /// Returns error if no type is registered under `key`.
    pub fn require(&self, key: &str) -> RegistryResult<&Arc<OperatorType>> {
        self.get(key).ok_or_else(|| RegistryError::UnknownType(key.to_string()))
    }

    /// Check whether `key` is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.types.contains_key(key)
    }

    /// Direct replacement recorded for `key`
    #[inline]
    #[must_use]
    pub fn replacement_for(&self, key: &str) -> Option<&str> {
        self.replacements.get(key).map(String::as_str)
    }

    /// Follow the replacement table from `key` to its current key
    ///
    /// # Errors
    /// Returns error if the chain revisits a key.
    pub fn resolve_key(&self, key: &str) -> RegistryResult<ResolvedKey> {
        let mut current = key;
        let mut hops = 0;
        while let Some(next) = self.replacement_for(current) {
            hops += 1;
            if hops > self.replacements.len() {
                return Err(RegistryError::ReplacementCycle(key.to_string()));
            }
            current = next;
        }
        Ok(ResolvedKey {
            key: current.to_string(),
            replaced_from: (hops > 0).then(|| key.to_string()),
        })
    }

    /// Register every type and replacement of a catalog
    ///
    /// Nothing is registered if any key collides.
    ///
    /// # Errors
    /// Returns error on the first duplicate key.
    pub fn load_catalog(&mut self, catalog: Catalog) -> RegistryResult<usize> {
        let mut seen = std::collections::HashSet::new();
        for descriptor in &catalog.operators {
            if self.contains(&descriptor.key) || !seen.insert(descriptor.key.as_str()) {
                return Err(RegistryError::DuplicateType(descriptor.key.clone()));
            }
        }
        let count = catalog.operators.len();
        for descriptor in catalog.operators {
            self.insert(descriptor, Arc::new(DescriptorFactory));
        }
        self.replacements.extend(catalog.replacements);
        Ok(count)
    }

    /// Parse and load catalog YAML
    ///
    /// # Errors
    /// Returns error if the text is invalid or a key collides.
    pub fn load_catalog_str(&mut self, text: &str) -> RegistryResult<usize> {
        self.load_catalog(Catalog::from_yaml(text)?)
    }

    /// Read and load a catalog file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or loaded.
    pub fn load_catalog_file(&mut self, path: &Path) -> RegistryResult<usize> {
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_catalog_str(&text)
    }

    /// Registered keys, unordered
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Number of registered types
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("types", &self.types.len())
            .field("replacements", &self.replacements.len())
            .finish()
    }
}
