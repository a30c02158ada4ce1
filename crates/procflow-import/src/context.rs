//! Process context: input/output locations and macros

use crate::markup::Element;
use indexmap::IndexMap;

/// Document-level execution context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessContext {
    /// Repository locations fed into the root unit's inner sources
    pub inputs: Vec<String>,
    /// Repository locations receiving the root unit's results
    pub outputs: Vec<String>,
    /// Macro definitions
    pub macros: IndexMap<String, String>,
}

impl ProcessContext {
    /// Read a `context` element
    #[must_use]
    pub fn from_element(element: &Element) -> Self {
        let locations = |tag: &str| -> Vec<String> {
            element
                .child(tag)
                .map(|group| {
                    group
                        .children_named("location")
                        .map(|l| l.text().unwrap_or_default().to_string())
                        .collect()
                })
                .unwrap_or_default()
        };

        let macros = element
            .child("macros")
            .map(|macros| {
                macros
                    .children_named("macro")
                    .filter_map(|m| {
                        let key = m.child("key")?.text()?.to_string();
                        let value = m.child("value").and_then(Element::text).unwrap_or_default();
                        Some((key, value.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            inputs: locations("input"),
            outputs: locations("output"),
            macros,
        }
    }

    /// Write a `context` element
    #[must_use]
    pub fn to_element(&self) -> Element {
        let locations = |tag: &str, values: &[String]| {
            values.iter().fold(Element::new(tag), |group, value| {
                group.with_child(Element::new("location").with_text(value.clone()))
            })
        };
        let macros = self.macros.iter().fold(Element::new("macros"), |group, (key, value)| {
            group.with_child(
                Element::new("macro")
                    .with_child(Element::new("key").with_text(key.clone()))
                    .with_child(Element::new("value").with_text(value.clone())),
            )
        });

        Element::new("context")
            .with_child(locations("input", &self.inputs))
            .with_child(locations("output", &self.outputs))
            .with_child(macros)
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty() && self.macros.is_empty()
    }
}
