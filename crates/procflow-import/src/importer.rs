//! Document import
//!
//! # Example
//!
//! ```
//! use procflow_import::Importer;
//! use procflow_registry::{OperatorRegistry, SOFTWARE_VERSION};
//! use std::sync::Arc;
//!
//! let importer = Importer::default()
//!     .with_operators(Arc::new(OperatorRegistry::with_root(SOFTWARE_VERSION)));
//! let outcome = importer
//!     .import_str(r#"<process version="9.0.000"><operator name="Process" class="process"/></process>"#)
//!     .unwrap();
//! assert_eq!(outcome.document.root.name, "Process");
//! assert!(outcome.diagnostics.is_empty());
//! ```

use crate::builder::{BuildEnv, Builder};
use crate::config::ImportConfig;
use crate::context::ProcessContext;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::ImportError;
use crate::export::Exporter;
use crate::filter::DocumentFilter;
use crate::markup::Element;
use crate::progress::ProgressSink;
use procflow_model::{IdAllocator, Operator, VersionNumber};
use procflow_registry::OperatorRegistry;
use procflow_rules::RuleRegistry;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// A loaded process document
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessDocument {
    /// Version the document declared, or the assumed default
    pub version: VersionNumber,
    /// Input/output locations and macros
    pub context: ProcessContext,
    /// Opaque annotations, written back unchanged
    pub annotations: Option<Element>,
    /// Root operator
    pub root: Operator,
}

/// Result of a successful import
#[derive(Debug)]
pub struct ImportOutcome {
    pub document: ProcessDocument,
    pub diagnostics: Diagnostics,
}

/// Result of importing a single operator subtree
#[derive(Debug)]
pub struct FragmentOutcome {
    pub operator: Operator,
    pub diagnostics: Diagnostics,
}

/// Builds operator graphs from process documents
///
/// Holds snapshots of the operator and rule registries; a running import
/// never observes registrations made after the snapshot was taken.
#[derive(Clone)]
pub struct Importer {
    config: ImportConfig,
    operators: Arc<OperatorRegistry>,
    rules: Arc<RuleRegistry>,
    filters: Vec<Arc<dyn DocumentFilter>>,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl Default for Importer {
    fn default() -> Self {
        Self::new(ImportConfig::default())
    }
}

impl fmt::Debug for Importer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Importer")
            .field("config", &self.config)
            .field("operators", &self.operators.len())
            .field("rules", &self.rules.len())
            .field("filters", &self.filters.len())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Importer {
    /// Create importer over snapshots of the process-wide registries
    #[must_use]
    pub fn new(config: ImportConfig) -> Self {
        Self {
            config,
            operators: procflow_registry::global().snapshot(),
            rules: procflow_rules::global().snapshot(),
            filters: Vec::new(),
            progress: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_operators(mut self, operators: Arc<OperatorRegistry>) -> Self {
        self.operators = operators;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_rules(mut self, rules: Arc<RuleRegistry>) -> Self {
        self.rules = rules;
        self
    }

    /// Add a document filter; filters run in the order they were added
    #[inline]
    #[must_use]
    pub fn with_filter(mut self, filter: impl DocumentFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    #[inline]
    #[must_use]
    pub fn with_progress(mut self, progress: impl ProgressSink + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    #[inline]
    #[must_use]
    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    /// Exporter sharing this importer's filters, writing the software version
    #[must_use]
    pub fn exporter(&self) -> Exporter {
        self.filters.iter().fold(
            Exporter::new(self.config.software_version.clone()),
            |exporter, filter| exporter.with_shared_filter(Arc::clone(filter)),
        )
    }

    /// Import a document from markup text
    ///
    /// # Errors
    /// Returns error if the markup is unparsable or the outermost operator
    /// is not of the root type.
    pub fn import_str(&self, text: &str) -> Result<ImportOutcome, ImportError> {
        let root = Element::parse(text).map_err(|e| {
            warn!(error = %e, "unparsable process document");
            e
        })?;
        self.import_element(&root)
    }

    /// Import a document file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, exceeds
    /// [`ImportConfig::max_document_bytes`], or fails to import.
    pub fn import_path(&self, path: &Path) -> Result<ImportOutcome, ImportError> {
        let size = std::fs::metadata(path)
            .map_err(|source| ImportError::io_error(path, source))?
            .len();
        if size > self.config.max_document_bytes as u64 {
            return Err(ImportError::TooLarge {
                size,
                max: self.config.max_document_bytes,
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| ImportError::io_error(path, source))?;
        self.import_str(&text)
    }

    /// Import a parsed document element
    ///
    /// A bare `operator` element is accepted as a document without version
    /// or context.
    ///
    /// # Errors
    /// Returns error if the outermost operator is not of the root type.
    pub fn import_element(&self, root: &Element) -> Result<ImportOutcome, ImportError> {
        let mut diagnostics = Diagnostics::new();
        let version = self.document_version(root, &mut diagnostics);

        let (operator_element, context, annotations) = if root.name() == "operator" {
            (root, ProcessContext::default(), None)
        } else {
            self.document_parts(root, &mut diagnostics)?
        };
        self.check_root_type(operator_element)?;

        let mut ids = IdAllocator::new();
        let builder = Builder::new(self.env(), Some(version.clone()), &mut ids, diagnostics);
        let (root_operator, diagnostics) = builder.build(operator_element);

        info!(
            operators = root_operator.subtree_size(),
            diagnostics = diagnostics.len(),
            modified = diagnostics.is_modified(),
            %version,
            "process imported"
        );
        Ok(ImportOutcome {
            document: ProcessDocument {
                version,
                context,
                annotations,
                root: root_operator,
            },
            diagnostics,
        })
    }

    /// Import a single operator subtree outside a document
    ///
    /// Operators without a `compatibility` attribute are treated as written
    /// by the running software. Ids continue from `ids`, so the fragment can
    /// be inserted into an existing process.
    ///
    /// # Errors
    /// Returns error if `element` is not an `operator` element.
    pub fn import_fragment(&self, element: &Element, ids: &mut IdAllocator) -> Result<FragmentOutcome, ImportError> {
        if element.name() != "operator" {
            return Err(ImportError::NotAnOperator(element.name().to_string()));
        }
        let builder = Builder::new(self.env(), None, ids, Diagnostics::new());
        let (operator, diagnostics) = builder.build(element);
        info!(operators = operator.subtree_size(), diagnostics = diagnostics.len(), "fragment imported");
        Ok(FragmentOutcome { operator, diagnostics })
    }

    fn env(&self) -> BuildEnv<'_> {
        BuildEnv {
            config: &self.config,
            operators: &self.operators,
            rules: &self.rules,
            filters: &self.filters,
            progress: self.progress.as_deref(),
        }
    }

    fn document_version(&self, root: &Element, diagnostics: &mut Diagnostics) -> VersionNumber {
        let fallback = self.config.default_document_version.clone();
        match root.attribute("version") {
            None => {
                diagnostics.push(
                    DiagnosticKind::MissingVersion,
                    None,
                    format!(
                        "Document has no version information; assuming {fallback}. \
                         Operators may behave differently than when the document was saved"
                    ),
                );
                fallback
            }
            Some(text) => text.parse().unwrap_or_else(|error| {
                diagnostics.push(
                    DiagnosticKind::InvalidVersion,
                    None,
                    format!("Invalid document version '{text}' ({error}); assuming {fallback}"),
                );
                fallback.clone()
            }),
        }
    }

    fn document_parts<'e>(
        &self,
        root: &'e Element,
        diagnostics: &mut Diagnostics,
    ) -> Result<(&'e Element, ProcessContext, Option<Element>), ImportError> {
        let mut operators = root.children_named("operator");
        let operator = operators.next().ok_or_else(|| {
            warn!("process document without root operator");
            ImportError::MissingRootOperator
        })?;
        if operators.next().is_some() {
            diagnostics.push(
                DiagnosticKind::Structure,
                None,
                "Document contains more than one root operator; only the first is loaded",
            );
        }

        for child in root.children() {
            if !matches!(child.name(), "operator" | "context" | "annotations") {
                diagnostics.push(
                    DiagnosticKind::Structure,
                    None,
                    format!("Unknown document element <{}> ignored", child.name()),
                );
            }
        }

        let context = root.child("context").map(ProcessContext::from_element).unwrap_or_default();
        Ok((operator, context, root.child("annotations").cloned()))
    }

    fn check_root_type(&self, element: &Element) -> Result<(), ImportError> {
        let class = element.attribute("class").unwrap_or_default();
        let resolved = self
            .operators
            .resolve_key(class)
            .map_or_else(|_| class.to_string(), |resolved| resolved.key);
        if resolved == self.config.root_key {
            return Ok(());
        }
        warn!(found = class, expected = %self.config.root_key, "outermost operator is not the root type");
        Err(ImportError::NotRootOperator {
            expected: self.config.root_key.clone(),
            found: class.to_string(),
        })
    }
}
