//! Registry errors

/// Errors raised while registering operator types or loading catalogs
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A type with this key is already registered
    #[error("operator type already registered: '{0}'")]
    DuplicateType(String),

    /// No type with this key is registered
    #[error("unknown operator type: '{0}'")]
    UnknownType(String),

    /// The replacement table maps a key onto itself, directly or indirectly
    #[error("replacement chain for '{0}' does not terminate")]
    ReplacementCycle(String),

    /// Catalog text is not a valid catalog document
    #[error("invalid operator catalog: {0}")]
    Catalog(#[from] serde_yaml::Error),

    /// Catalog file could not be read
    #[error("io error reading catalog {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;
