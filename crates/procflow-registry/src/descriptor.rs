//! Operator type descriptors
//!
//! A descriptor declares everything the importer needs to know about an
//! operator type: its parameter schema, its ports, its nested subprocesses and
//! its compatibility history. Descriptors are plain data and can be read from
//! YAML catalogs.

use procflow_model::{
    CompatibilityHistory, ExecutionUnit, ExtenderSpec, ParameterKind, PortDirection, PortSpec, Ports,
    VersionNumber,
};
use serde::{Deserialize, Serialize};

/// Declared parameter of an operator type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterType {
    /// Parameter key
    pub key: String,
    /// Expected value shape
    #[serde(default)]
    pub kind: ParameterKind,
    /// Default value, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ParameterType {
    /// Single-valued parameter
    #[inline]
    #[must_use]
    pub fn single(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: ParameterKind::Single,
            default: None,
        }
    }

    /// List parameter
    #[inline]
    #[must_use]
    pub fn list(key: impl Into<String>) -> Self {
        Self {
            kind: ParameterKind::List,
            ..Self::single(key)
        }
    }

    /// Enumeration parameter
    #[inline]
    #[must_use]
    pub fn enumeration(key: impl Into<String>) -> Self {
        Self {
            kind: ParameterKind::Enumeration,
            ..Self::single(key)
        }
    }

    /// Set default value
    #[inline]
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Declared nested execution unit of a composite operator type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubprocessSpec {
    /// Unit name
    pub name: String,
    /// Fixed inner source ports
    #[serde(default)]
    pub inner_sources: Vec<PortSpec>,
    /// Fixed inner sink ports
    #[serde(default)]
    pub inner_sinks: Vec<PortSpec>,
    /// Extender on the inner sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_extender: Option<ExtenderSpec>,
    /// Extender on the inner sinks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink_extender: Option<ExtenderSpec>,
}

impl SubprocessSpec {
    /// Unit without boundary ports
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner_sources: Vec::new(),
            inner_sinks: Vec::new(),
            source_extender: None,
            sink_extender: None,
        }
    }

    /// Unit whose boundary grows `in n` sources and `out n` sinks
    #[inline]
    #[must_use]
    pub fn extending(name: impl Into<String>, source_prefix: &str, sink_prefix: &str) -> Self {
        Self {
            source_extender: Some(ExtenderSpec::any(source_prefix)),
            sink_extender: Some(ExtenderSpec::any(sink_prefix)),
            ..Self::new(name)
        }
    }

    /// Add a fixed inner source
    #[inline]
    #[must_use]
    pub fn with_source(mut self, port: PortSpec) -> Self {
        self.inner_sources.push(port);
        self
    }

    /// Add a fixed inner sink
    #[inline]
    #[must_use]
    pub fn with_sink(mut self, port: PortSpec) -> Self {
        self.inner_sinks.push(port);
        self
    }

    /// Build an empty unit with this boundary
    #[must_use]
    pub fn instantiate(&self) -> ExecutionUnit {
        ExecutionUnit::new(
            self.name.clone(),
            Ports::new(PortDirection::Output, &self.inner_sources, self.source_extender.as_ref()),
            Ports::new(PortDirection::Input, &self.inner_sinks, self.sink_extender.as_ref()),
        )
    }
}

/// Descriptor of one operator type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorDescriptor {
    /// Stable type key
    pub key: String,
    /// Declared parameters
    #[serde(default)]
    pub parameters: Vec<ParameterType>,
    /// Fixed input ports
    #[serde(default)]
    pub inputs: Vec<PortSpec>,
    /// Fixed output ports
    #[serde(default)]
    pub outputs: Vec<PortSpec>,
    /// Input extender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_extender: Option<ExtenderSpec>,
    /// Output extender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_extender: Option<ExtenderSpec>,
    /// Nested execution units
    #[serde(default)]
    pub subprocesses: Vec<SubprocessSpec>,
    /// Latest behavioral version
    pub latest_version: VersionNumber,
    /// Versions at which behavior changed incompatibly
    #[serde(default)]
    pub incompatible_versions: Vec<VersionNumber>,
}

impl OperatorDescriptor {
    /// Create descriptor without ports, parameters or subprocesses
    #[must_use]
    pub fn new(key: impl Into<String>, latest_version: VersionNumber) -> Self {
        Self {
            key: key.into(),
            parameters: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            input_extender: None,
            output_extender: None,
            subprocesses: Vec::new(),
            latest_version,
            incompatible_versions: Vec::new(),
        }
    }

    /// Add parameter
    #[inline]
    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterType) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Add input port
    #[inline]
    #[must_use]
    pub fn with_input(mut self, port: PortSpec) -> Self {
        self.inputs.push(port);
        self
    }

    /// Add output port
    #[inline]
    #[must_use]
    pub fn with_output(mut self, port: PortSpec) -> Self {
        self.outputs.push(port);
        self
    }

    /// Set input extender
    #[inline]
    #[must_use]
    pub fn with_input_extender(mut self, extender: ExtenderSpec) -> Self {
        self.input_extender = Some(extender);
        self
    }

    /// Set output extender
    #[inline]
    #[must_use]
    pub fn with_output_extender(mut self, extender: ExtenderSpec) -> Self {
        self.output_extender = Some(extender);
        self
    }

    /// Add subprocess
    #[inline]
    #[must_use]
    pub fn with_subprocess(mut self, subprocess: SubprocessSpec) -> Self {
        self.subprocesses.push(subprocess);
        self
    }

    /// Record an incompatible behavior change
    #[inline]
    #[must_use]
    pub fn with_incompatible_version(mut self, version: VersionNumber) -> Self {
        self.incompatible_versions.push(version);
        self
    }

    /// Declared parameter for `key`
    #[inline]
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&ParameterType> {
        self.parameters.iter().find(|p| p.key == key)
    }

    /// Number of nested execution units
    #[inline]
    #[must_use]
    pub fn subprocess_count(&self) -> usize {
        self.subprocesses.len()
    }

    /// Compatibility history (sorted)
    #[must_use]
    pub fn history(&self) -> CompatibilityHistory {
        CompatibilityHistory::new(self.latest_version.clone(), self.incompatible_versions.clone())
    }

    /// Fresh input port group
    #[must_use]
    pub fn input_ports(&self) -> Ports {
        Ports::new(PortDirection::Input, &self.inputs, self.input_extender.as_ref())
    }

    /// Fresh output port group
    #[must_use]
    pub fn output_ports(&self) -> Ports {
        Ports::new(PortDirection::Output, &self.outputs, self.output_extender.as_ref())
    }
}
