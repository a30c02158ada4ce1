//! Document filters
//!
//! Collaborators that persist their own data next to the graph (layout,
//! annotations, descriptions) hook into import and export here. Each hook
//! runs once per operator or execution unit. Filters store what they read in
//! [`Operator::auxiliary`] and write it back on export.

use crate::markup::Element;
use procflow_model::{ExecutionUnit, Operator};

/// Tags owned by filters; the importer skips them without a diagnostic
pub const FILTER_OWNED_TAGS: &[&str] = &["description", "background", "portSpacing"];

/// Import/export extension point
pub trait DocumentFilter: Send + Sync {
    /// Operator was built from `element`
    fn operator_imported(&self, _element: &Element, _operator: &mut Operator) {}

    /// Operator was written into `element`
    fn operator_exported(&self, _operator: &Operator, _element: &mut Element) {}

    /// Unit was built from `element`
    fn unit_imported(&self, _element: &Element, _unit: &mut ExecutionUnit) {}

    /// Unit was written into `element`
    fn unit_exported(&self, _unit: &ExecutionUnit, _element: &mut Element) {}
}

/// Keeps selected operator attributes across import and export
///
/// # Example
///
/// ```rust
/// use procflow_import::RetainAttributesFilter;
///
/// // editor layout coordinates
/// let filter = RetainAttributesFilter::new(["x", "y", "width", "height"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RetainAttributesFilter {
    attributes: Vec<String>,
}

impl RetainAttributesFilter {
    #[must_use]
    pub fn new<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }
}

impl DocumentFilter for RetainAttributesFilter {
    fn operator_imported(&self, element: &Element, operator: &mut Operator) {
        for name in &self.attributes {
            if let Some(value) = element.attribute(name) {
                operator.auxiliary.insert(name.clone(), value.to_string());
            }
        }
    }

    fn operator_exported(&self, operator: &Operator, element: &mut Element) {
        for name in &self.attributes {
            if let Some(value) = operator.auxiliary.get(name) {
                element.set_attribute(name.clone(), value.clone());
            }
        }
    }
}

/// Auxiliary key under which [`DescriptionFilter`] keeps operator descriptions
pub const DESCRIPTION_KEY: &str = "description";

/// Keeps the `description` child of operators
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptionFilter;

impl DocumentFilter for DescriptionFilter {
    fn operator_imported(&self, element: &Element, operator: &mut Operator) {
        if let Some(text) = element.child(DESCRIPTION_KEY).and_then(Element::text) {
            operator.auxiliary.insert(DESCRIPTION_KEY.to_string(), text.to_string());
        }
    }

    fn operator_exported(&self, operator: &Operator, element: &mut Element) {
        if let Some(text) = operator.auxiliary.get(DESCRIPTION_KEY) {
            element.push_child(Element::new(DESCRIPTION_KEY).with_text(text.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procflow_model::{OperatorId, PortDirection, Ports};

    fn operator() -> Operator {
        Operator::new(
            OperatorId::new(1),
            "A",
            "a",
            Ports::empty(PortDirection::Input),
            Ports::empty(PortDirection::Output),
        )
    }

    #[test]
    fn retained_attributes_round_trip() {
        let filter = RetainAttributesFilter::new(["x", "y"]);
        let element = Element::new("operator").with_attribute("x", "10").with_attribute("z", "3");
        let mut op = operator();
        filter.operator_imported(&element, &mut op);
        assert_eq!(op.auxiliary.get("x").map(String::as_str), Some("10"));
        assert!(!op.auxiliary.contains_key("z"));

        let mut out = Element::new("operator");
        filter.operator_exported(&op, &mut out);
        assert_eq!(out.attribute("x"), Some("10"));
        assert_eq!(out.attribute("y"), None);
    }

    #[test]
    fn description_round_trip() {
        let element = Element::new("operator").with_child(Element::new("description").with_text("loads data"));
        let mut op = operator();
        DescriptionFilter.operator_imported(&element, &mut op);

        let mut out = Element::new("operator");
        DescriptionFilter.operator_exported(&op, &mut out);
        assert_eq!(out.child("description").and_then(Element::text), Some("loads data"));
    }
}
