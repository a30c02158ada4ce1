//! Rule errors
//!
//! [`RuleError`] is raised while a rule runs and only skips that rule.
//! [`RuleDefinitionError`] is raised while loading rule documents.

use procflow_model::ParameterKind;
use procflow_registry::RegistryError;
use std::path::PathBuf;

/// Failure of a single rule application
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Rule needs a parameter the operator does not set
    #[error("parameter '{0}' is not set")]
    MissingParameter(String),

    /// Parameter has a different shape than the rule expects
    #[error("parameter '{key}' is {actual:?}, expected {expected:?}")]
    WrongKind {
        key: String,
        expected: ParameterKind,
        actual: ParameterKind,
    },

    /// Operator has fewer execution units than the rule addresses
    #[error("execution unit {index} does not exist, operator has {count}")]
    NoSuchUnit { index: usize, count: usize },

    /// Replacement type is not registered
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Failure while loading rule definitions
#[derive(Debug, thiserror::Error)]
pub enum RuleDefinitionError {
    /// Document is not valid rule YAML
    #[error("invalid rule document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Entry names neither `operator` nor `applies_to`
    #[error("rule #{index} names no operator type")]
    MissingTarget { index: usize },

    /// Entry names both `operator` and `applies_to`
    #[error("rule #{index} names both `operator` and `applies_to`")]
    ConflictingTarget { index: usize },

    /// Rule document could not be read
    #[error("io error reading rules {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
