//! Ports and port groups
//!
//! A [`Ports`] group holds the input or output ports of one operator or one
//! execution-unit boundary. Groups may carry an extender that grows numbered
//! ports (`in 1`, `in 2`, ...) on demand while a document is loading.

use crate::error::{GraphError, GraphResult};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Data type accepted by every input port
pub const ANY_TYPE: &str = "IOObject";

/// Check whether an input of type `input` may receive data of type `output`
#[inline]
#[must_use]
pub fn accepts(input: &str, output: &str) -> bool {
    input == ANY_TYPE || output == ANY_TYPE || input == output
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    /// Receives data
    Input,
    /// Produces data
    Output,
}

impl Display for PortDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

fn default_type() -> String {
    ANY_TYPE.to_string()
}

/// Declared port of an operator type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    /// Port name
    pub name: String,
    /// Data type name
    #[serde(default = "default_type")]
    pub data_type: String,
}

impl PortSpec {
    /// Port spec with an explicit data type
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    /// Port spec accepting any data
    #[inline]
    #[must_use]
    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, ANY_TYPE)
    }
}

/// Declared extender of a port group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtenderSpec {
    /// Name prefix, ports are named `"{prefix} {n}"`
    pub prefix: String,
    /// Data type of grown ports
    #[serde(default = "default_type")]
    pub data_type: String,
}

impl ExtenderSpec {
    /// Extender accepting any data
    #[inline]
    #[must_use]
    pub fn any(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            data_type: default_type(),
        }
    }

    /// Number encoded in `name` if it belongs to this extender
    #[must_use]
    pub fn number_of(&self, name: &str) -> Option<usize> {
        let rest = name.strip_prefix(self.prefix.as_str())?.strip_prefix(' ')?;
        rest.parse().ok().filter(|n| *n > 0)
    }

    /// Name of the `n`-th grown port
    #[inline]
    #[must_use]
    pub fn port_name(&self, n: usize) -> String {
        format!("{} {}", self.prefix, n)
    }
}

/// One port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    name: String,
    data_type: String,
}

impl Port {
    /// Port name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Data type name
    #[inline]
    #[must_use]
    pub fn data_type(&self) -> &str {
        &self.data_type
    }
}

/// How a port group may grow
#[derive(Debug, Clone, PartialEq, Eq)]
enum Growth {
    Fixed,
    Extender { spec: ExtenderSpec, grown: usize },
    Open,
}

/// Result of a non-mutating port lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortLookup {
    /// Port exists at this index
    Existing(usize),
    /// Port does not exist yet but the group can create it
    Growable,
    /// Port does not exist and cannot be created
    Missing,
}

/// Ordered group of same-direction ports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ports {
    direction: PortDirection,
    ports: Vec<Port>,
    growth: Growth,
    locked: bool,
}

impl Ports {
    /// Group with fixed ports and an optional extender
    ///
    /// An extender starts with its first numbered port already present.
    #[must_use]
    pub fn new(direction: PortDirection, specs: &[PortSpec], extender: Option<&ExtenderSpec>) -> Self {
        let mut ports: Vec<Port> = specs
            .iter()
            .map(|spec| Port {
                name: spec.name.clone(),
                data_type: spec.data_type.clone(),
            })
            .collect();

        let growth = match extender {
            Some(spec) => {
                ports.push(Port {
                    name: spec.port_name(1),
                    data_type: spec.data_type.clone(),
                });
                Growth::Extender {
                    spec: spec.clone(),
                    grown: 1,
                }
            }
            None => Growth::Fixed,
        };

        Self {
            direction,
            ports,
            growth,
            locked: false,
        }
    }

    /// Empty group without growth
    #[inline]
    #[must_use]
    pub fn empty(direction: PortDirection) -> Self {
        Self::new(direction, &[], None)
    }

    /// Group that creates any requested port while unlocked
    #[inline]
    #[must_use]
    pub fn open(direction: PortDirection) -> Self {
        Self {
            direction,
            ports: Vec::new(),
            growth: Growth::Open,
            locked: false,
        }
    }

    /// Direction of all ports in this group
    #[inline]
    #[must_use]
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Number of ports
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Check if group has no ports
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Port by index
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Port> {
        self.ports.get(index)
    }

    /// Iterate ports in order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    /// Index of the port named `name`
    #[inline]
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.ports.iter().position(|p| p.name == name)
    }

    /// Whether the group can still grow
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// The group's extender, if any
    #[inline]
    #[must_use]
    pub fn extender(&self) -> Option<&ExtenderSpec> {
        match &self.growth {
            Growth::Extender { spec, .. } => Some(spec),
            _ => None,
        }
    }

    /// Lock the group against further growth
    #[inline]
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Look up a port without creating it
    #[must_use]
    pub fn lookup(&self, name: &str) -> PortLookup {
        if let Some(index) = self.position(name) {
            return PortLookup::Existing(index);
        }
        if self.locked {
            return PortLookup::Missing;
        }
        match &self.growth {
            Growth::Fixed => PortLookup::Missing,
            Growth::Extender { spec, .. } => {
                if spec.number_of(name).is_some() {
                    PortLookup::Growable
                } else {
                    PortLookup::Missing
                }
            }
            Growth::Open => PortLookup::Growable,
        }
    }

    /// Get the index of `name`, growing the group if allowed
    ///
    /// # Errors
    /// Returns [`GraphError::Locked`] if the port would have to be created on a
    /// locked group, [`GraphError::NoSuchPort`] if the group cannot create it.
    pub fn get_or_grow(&mut self, name: &str) -> GraphResult<usize> {
        match self.lookup(name) {
            PortLookup::Existing(index) => Ok(index),
            PortLookup::Growable => Ok(self.grow_to(name)),
            PortLookup::Missing if self.locked && self.growth != Growth::Fixed => Err(GraphError::Locked {
                direction: self.direction,
                name: name.to_string(),
            }),
            PortLookup::Missing => Err(GraphError::NoSuchPort {
                direction: self.direction,
                name: name.to_string(),
            }),
        }
    }

    /// Append the next numbered extender port
    ///
    /// # Errors
    /// Fails if the group is locked or has no extender.
    pub fn grow_next(&mut self) -> GraphResult<usize> {
        let name = match &self.growth {
            Growth::Extender { spec, grown } => spec.port_name(grown + 1),
            _ => {
                return Err(GraphError::NoSuchPort {
                    direction: self.direction,
                    name: "<extender>".to_string(),
                })
            }
        };
        self.get_or_grow(&name)
    }

    fn grow_to(&mut self, name: &str) -> usize {
        match &mut self.growth {
            Growth::Extender { spec, grown } => {
                let target = spec.number_of(name).unwrap_or(*grown);
                while *grown < target {
                    *grown += 1;
                    self.ports.push(Port {
                        name: spec.port_name(*grown),
                        data_type: spec.data_type.clone(),
                    });
                }
            }
            Growth::Open => self.ports.push(Port {
                name: name.to_string(),
                data_type: ANY_TYPE.to_string(),
            }),
            Growth::Fixed => {}
        }
        self.position(name).unwrap_or(self.ports.len().saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_rules() {
        assert!(accepts("ExampleSet", "ExampleSet"));
        assert!(accepts(ANY_TYPE, "Model"));
        assert!(accepts("Model", ANY_TYPE));
        assert!(!accepts("Model", "ExampleSet"));
    }

    #[test]
    fn fixed_ports_lookup() {
        let ports = Ports::new(PortDirection::Input, &[PortSpec::any("in")], None);
        assert_eq!(ports.lookup("in"), PortLookup::Existing(0));
        assert_eq!(ports.lookup("other"), PortLookup::Missing);
    }

    #[test]
    fn extender_grows_up_to_requested_number() {
        let mut ports = Ports::new(PortDirection::Output, &[], Some(&ExtenderSpec::any("out")));
        assert_eq!(ports.len(), 1);
        assert_eq!(ports.lookup("out 3"), PortLookup::Growable);
        assert_eq!(ports.get_or_grow("out 3").unwrap(), 2);
        let names: Vec<_> = ports.iter().map(Port::name).collect();
        assert_eq!(names, vec!["out 1", "out 2", "out 3"]);
        assert_eq!(ports.grow_next().unwrap(), 3);
    }

    #[test]
    fn extender_rejects_foreign_names() {
        let mut ports = Ports::new(PortDirection::Input, &[], Some(&ExtenderSpec::any("in")));
        assert_eq!(ports.lookup("input 2"), PortLookup::Missing);
        assert_eq!(ports.lookup("in 0"), PortLookup::Missing);
        assert!(matches!(ports.get_or_grow("in x"), Err(GraphError::NoSuchPort { .. })));
    }

    #[test]
    fn locked_extender_does_not_grow() {
        let mut ports = Ports::new(PortDirection::Input, &[], Some(&ExtenderSpec::any("in")));
        ports.lock();
        assert_eq!(ports.lookup("in 2"), PortLookup::Missing);
        assert!(matches!(ports.get_or_grow("in 2"), Err(GraphError::Locked { .. })));
        assert_eq!(ports.lookup("in 1"), PortLookup::Existing(0));
    }

    #[test]
    fn open_group_accepts_any_name() {
        let mut ports = Ports::open(PortDirection::Input);
        assert_eq!(ports.get_or_grow("example set").unwrap(), 0);
        assert_eq!(ports.get_or_grow("example set").unwrap(), 0);
        assert_eq!(ports.get_or_grow("model").unwrap(), 1);
        ports.lock();
        assert!(ports.get_or_grow("other").is_err());
    }
}
