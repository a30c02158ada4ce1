//! procflow Import
//!
//! Loads process documents into operator graphs, migrating outdated
//! constructs on the way, and writes graphs back as markup.
//!
//! # Core Concepts
//!
//! - [`Importer`]: Markup → [`ProcessDocument`] plus [`Diagnostics`]
//! - [`Diagnostics`]: Ordered non-fatal findings and the "modified by migration" flag
//! - [`DocumentFilter`]: Hooks for collaborators persisting their own data
//! - [`Exporter`]: [`ProcessDocument`] → markup in the current layout
//! - [`wire_unit`]: Automatic data-flow construction for one execution unit
//!
//! Only two conditions abort an import: unparsable markup and an outermost
//! operator that is not of the root type. Everything else degrades to a
//! diagnostic.
//!
//! # Example
//!
//! ```rust
//! use procflow_import::{ImportConfig, Importer};
//! use procflow_model::{PortSpec, VersionNumber};
//! use procflow_registry::{OperatorDescriptor, OperatorRegistry, SOFTWARE_VERSION};
//! use std::sync::Arc;
//!
//! let mut operators = OperatorRegistry::with_root(SOFTWARE_VERSION);
//! operators
//!     .register(OperatorDescriptor::new("source", SOFTWARE_VERSION).with_output(PortSpec::any("out")))
//!     .unwrap();
//!
//! let importer = Importer::new(ImportConfig::default()).with_operators(Arc::new(operators));
//! let outcome = importer
//!     .import_str(
//!         r#"<process version="9.0.000">
//!              <operator name="Process" class="process">
//!                <process>
//!                  <operator name="S" class="source"/>
//!                  <connect from_op="S" from_port="out" to_port="result 1"/>
//!                </process>
//!              </operator>
//!            </process>"#,
//!     )
//!     .unwrap();
//!
//! assert!(outcome.diagnostics.is_empty());
//! let main = &outcome.document.root.units[0];
//! assert_eq!(main.connections().len(), 1);
//! assert_eq!(outcome.document.root.compatibility, VersionNumber::new(9, 0, 0));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod autowire;
mod builder;
mod config;
mod context;
mod diagnostics;
mod error;
mod export;
mod filter;
mod importer;
mod jobs;
mod markup;
mod progress;

pub use autowire::wire_unit;
pub use config::{ConfigError, ImportConfig};
pub use context::ProcessContext;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{ExportError, ImportError};
pub use export::Exporter;
pub use filter::{DescriptionFilter, DocumentFilter, RetainAttributesFilter, DESCRIPTION_KEY, FILTER_OWNED_TAGS};
pub use importer::{FragmentOutcome, ImportOutcome, Importer, ProcessDocument};
pub use markup::{Element, MarkupError};
pub use progress::{ChannelProgress, Progress, ProgressSink};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
