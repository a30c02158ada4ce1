//! Testing utilities for procflow workspace
//!
//! Fixture operator catalog and rules, plus helpers that assemble process
//! documents from markup snippets.

#![allow(missing_docs)]

use procflow_registry::{OperatorRegistry, SOFTWARE_VERSION};
use procflow_rules::RuleRegistry;

/// Operator types used across the integration tests
///
/// `foo` changed behavior incompatibly in 6.0.0; `old_foo` is its deprecated
/// key. `read`, `learn` and `apply` carry typed ports for automatic wiring.
pub const FIXTURE_CATALOG: &str = r#"
operators:
  - key: foo
    latest_version: "9.0.0"
    incompatible_versions: ["6.0.0"]
    parameters:
      - key: size
        default: "10"
      - key: mode
      - key: weights
        kind: list
    inputs: [{ name: in }]
    outputs: [{ name: out }]
  - key: a
    latest_version: "9.0.0"
    outputs: [{ name: out }]
  - key: b
    latest_version: "9.0.0"
    inputs: [{ name: in }]
  - key: read
    latest_version: "9.0.0"
    parameters: [{ key: file }]
    outputs: [{ name: output, data_type: ExampleSet }]
  - key: learn
    latest_version: "9.0.0"
    inputs: [{ name: training set, data_type: ExampleSet }]
    outputs: [{ name: model, data_type: Model }]
  - key: apply
    latest_version: "9.0.0"
    inputs:
      - { name: model, data_type: Model }
      - { name: unlabelled data, data_type: ExampleSet }
    outputs: [{ name: labelled data, data_type: ExampleSet }]
  - key: chain
    latest_version: "9.0.0"
    parameters: [{ key: trivial }]
    input_extender: { prefix: in }
    output_extender: { prefix: out }
    subprocesses:
      - name: Subprocess
        source_extender: { prefix: in }
        sink_extender: { prefix: out }
  - key: branch
    latest_version: "9.0.0"
    parameters: [{ key: condition }]
    input_extender: { prefix: input }
    output_extender: { prefix: output }
    subprocesses:
      - name: Then
        source_extender: { prefix: input }
        sink_extender: { prefix: output }
      - name: Else
        source_extender: { prefix: input }
        sink_extender: { prefix: output }
replacements:
  old_foo: foo
"#;

/// Migration rules for the fixture catalog
pub const FIXTURE_RULES: &str = r#"
rules:
  - operator: foo
    when: { parameter_set: { key: old_size } }
    action: rename_parameter
    from: old_size
    to: size
  - operator: foo
    applies_before: "6.0.0"
    when: { parameter_equals: { key: mode, value: legacy } }
    action: change_parameter_value
    key: mode
    to: compatible
  - name: unwrap trivial chains
    operator: chain
    when: { parameter_equals: { key: trivial, value: "true" } }
    action: unwrap_operator
  - operator: branch
    applies_before: "7.0.0"
    when: { parameter_set: { key: condition } }
    action: exchange_subprocesses
    first: 0
    second: 1
"#;

/// Registry with the root type and [`FIXTURE_CATALOG`]
pub fn fixture_registry() -> OperatorRegistry {
    let mut registry = OperatorRegistry::with_root(SOFTWARE_VERSION);
    registry.load_catalog_str(FIXTURE_CATALOG).unwrap();
    registry
}

/// Rules of [`FIXTURE_RULES`]
pub fn fixture_rules() -> RuleRegistry {
    let mut rules = RuleRegistry::new();
    rules.load_yaml(FIXTURE_RULES).unwrap();
    rules
}

/// Document whose main unit contains `body`; no `version` attribute when `version` is `None`
pub fn document(version: Option<&str>, body: &str) -> String {
    let version = version.map(|v| format!(r#" version="{v}""#)).unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<process{version}>
  <context><input/><output/><macros/></context>
  <operator activated="true" class="process" expanded="true" name="Process">
    <process expanded="true">
{body}
    </process>
  </operator>
</process>"#
    )
}

/// Pre-5.0 document with `body` nested directly in the root operator
pub fn legacy_document(version: &str, body: &str) -> String {
    format!(
        r#"<process version="{version}">
  <operator name="Root" class="process">
{body}
  </operator>
</process>"#
    )
}

/// Operator element with `inner` as content
pub fn operator(name: &str, class: &str, inner: &str) -> String {
    if inner.is_empty() {
        format!(r#"<operator name="{name}" class="{class}"/>"#)
    } else {
        format!(r#"<operator name="{name}" class="{class}">{inner}</operator>"#)
    }
}

/// Single-valued parameter element
pub fn parameter(key: &str, value: &str) -> String {
    format!(r#"<parameter key="{key}" value="{value}"/>"#)
}

/// Connect element; `None` stands for the unit boundary
pub fn connect(from_op: Option<&str>, from_port: &str, to_op: Option<&str>, to_port: &str) -> String {
    let from_op = from_op.map(|op| format!(r#" from_op="{op}""#)).unwrap_or_default();
    let to_op = to_op.map(|op| format!(r#" to_op="{op}""#)).unwrap_or_default();
    format!(r#"<connect{from_op} from_port="{from_port}"{to_op} to_port="{to_port}"/>"#)
}
