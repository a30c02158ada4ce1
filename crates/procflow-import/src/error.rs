//! Import and export errors
//!
//! Only conditions that make a document unusable are errors; everything else
//! becomes a [`Diagnostic`](crate::Diagnostic).

use crate::markup::MarkupError;
use std::path::PathBuf;

/// Fatal import failure
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Markup could not be parsed
    #[error(transparent)]
    Markup(#[from] MarkupError),

    /// Outermost operator is not of the root type
    #[error("outermost operator must be of type '{expected}', found '{found}'")]
    NotRootOperator { expected: String, found: String },

    /// Document contains no operator
    #[error("document contains no root operator")]
    MissingRootOperator,

    /// Fragment element is not an operator
    #[error("expected an <operator> element, found <{0}>")]
    NotAnOperator(String),

    /// Document file exceeds the configured size limit
    #[error("document too large: {size} bytes (max: {max})")]
    TooLarge { size: u64, max: usize },

    /// Document file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ImportError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Export failure
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Markup could not be written
    #[error(transparent)]
    Markup(#[from] MarkupError),

    /// Output file could not be written
    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
