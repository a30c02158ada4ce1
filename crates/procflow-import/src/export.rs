//! Graph to markup
//!
//! Writes the current document layout: every operator carries its resolved
//! compatibility level, units are `process` elements and connections are
//! written by operator and port name.

use crate::error::ExportError;
use crate::filter::DocumentFilter;
use crate::importer::ProcessDocument;
use crate::markup::Element;
use procflow_model::{ExecutionUnit, Operator, ParameterValue, VersionNumber};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Writes process documents
#[derive(Clone)]
pub struct Exporter {
    version: VersionNumber,
    filters: Vec<Arc<dyn DocumentFilter>>,
}

impl fmt::Debug for Exporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exporter")
            .field("version", &self.version)
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl Exporter {
    /// Create exporter writing documents of `version`
    #[must_use]
    pub fn new(version: VersionNumber) -> Self {
        Self {
            version,
            filters: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_filter(self, filter: impl DocumentFilter + 'static) -> Self {
        self.with_shared_filter(Arc::new(filter))
    }

    #[inline]
    #[must_use]
    pub fn with_shared_filter(mut self, filter: Arc<dyn DocumentFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Document element for `document`
    #[must_use]
    pub fn export_document(&self, document: &ProcessDocument) -> Element {
        let mut element = Element::new("process")
            .with_attribute("version", self.version.to_string())
            .with_child(document.context.to_element());
        if let Some(annotations) = &document.annotations {
            element.push_child(annotations.clone());
        }
        element.with_child(self.export_operator(&document.root))
    }

    /// Operator element, including nested units
    #[must_use]
    pub fn export_operator(&self, operator: &Operator) -> Element {
        let mut element = Element::new("operator")
            .with_attribute("activated", flag(operator.enabled))
            .with_attribute("class", operator.export_key())
            .with_attribute("compatibility", operator.compatibility.to_string())
            .with_attribute("expanded", flag(operator.expanded))
            .with_attribute("name", operator.name.clone());
        if !operator.breakpoints.is_empty() {
            let breakpoints: Vec<&str> = operator.breakpoints.iter().map(|b| b.as_str()).collect();
            element.set_attribute("breakpoints", breakpoints.join(","));
        }

        for (key, value) in operator.parameters.iter() {
            element.push_child(parameter_element(key, value));
        }
        for unit in &operator.units {
            element.push_child(self.export_unit(unit));
        }
        for filter in &self.filters {
            filter.operator_exported(operator, &mut element);
        }
        element
    }

    fn export_unit(&self, unit: &ExecutionUnit) -> Element {
        let mut element = Element::new("process").with_attribute("expanded", flag(unit.is_expanded()));
        for operator in unit.operators() {
            element.push_child(self.export_operator(operator));
        }
        for connection in unit.named_connections() {
            let mut connect = Element::new("connect");
            if let Some(op) = connection.from_op {
                connect.set_attribute("from_op", op);
            }
            connect.set_attribute("from_port", connection.from_port);
            if let Some(op) = connection.to_op {
                connect.set_attribute("to_op", op);
            }
            connect.set_attribute("to_port", connection.to_port);
            element.push_child(connect);
        }
        for filter in &self.filters {
            filter.unit_exported(unit, &mut element);
        }
        element
    }

    /// Serialized markup of `document`
    ///
    /// # Errors
    /// Returns error if the markup cannot be written.
    pub fn render(&self, document: &ProcessDocument) -> Result<String, ExportError> {
        Ok(self.export_document(document).to_document_string()?)
    }

    /// Write `document` to a file
    ///
    /// # Errors
    /// Returns error if the markup cannot be written or the file cannot be
    /// created.
    pub fn write_path(&self, document: &ProcessDocument, path: &Path) -> Result<(), ExportError> {
        let text = self.render(document)?;
        std::fs::write(path, text).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), operators = document.root.subtree_size(), "process exported");
        Ok(())
    }
}

fn parameter_element(key: &str, value: &ParameterValue) -> Element {
    match value {
        ParameterValue::Single(value) => Element::new("parameter")
            .with_attribute("key", key)
            .with_attribute("value", value.clone()),
        ParameterValue::List(entries) => entries.iter().fold(
            Element::new("list").with_attribute("key", key),
            |list, (entry_key, entry_value)| {
                list.with_child(
                    Element::new("parameter")
                        .with_attribute("key", entry_key.clone())
                        .with_attribute("value", entry_value.clone()),
                )
            },
        ),
        ParameterValue::Enumeration(values) => values.iter().fold(
            Element::new("enumeration").with_attribute("key", key),
            |enumeration, value| {
                enumeration.with_child(
                    Element::new("parameter")
                        .with_attribute("key", key)
                        .with_attribute("value", value.clone()),
                )
            },
        ),
    }
}
