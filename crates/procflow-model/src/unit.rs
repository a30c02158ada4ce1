//! Execution units
//!
//! An [`ExecutionUnit`] owns its operators in a vector and stores connections
//! as index pairs into that vector. The unit boundary is addressed with
//! [`NodeRef::Boundary`]: inner sources act as output ports inside the unit,
//! inner sinks act as input ports.

use crate::error::{GraphError, GraphResult};
use crate::operator::{Operator, OperatorId};
use crate::port::{PortDirection, Ports};

/// Node addressed by a connection endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeRef {
    /// The unit's own boundary (inner sources or inner sinks)
    Boundary,
    /// Operator at this index in the unit
    Operator(usize),
}

/// One end of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    pub node: NodeRef,
    pub port: usize,
}

impl Endpoint {
    /// Endpoint on an operator
    #[inline]
    #[must_use]
    pub const fn operator(index: usize, port: usize) -> Self {
        Self {
            node: NodeRef::Operator(index),
            port,
        }
    }

    /// Endpoint on the unit boundary
    #[inline]
    #[must_use]
    pub const fn boundary(port: usize) -> Self {
        Self {
            node: NodeRef::Boundary,
            port,
        }
    }
}

/// Directed edge from an output endpoint to an input endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Connection {
    pub from: Endpoint,
    pub to: Endpoint,
}

/// Connection described by operator and port names
///
/// `None` operator names denote the unit boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamedConnection {
    pub from_op: Option<String>,
    pub from_port: String,
    pub to_op: Option<String>,
    pub to_port: String,
}

/// Ordered container of sibling operators with boundary ports
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionUnit {
    name: String,
    expanded: bool,
    operators: Vec<Operator>,
    inner_sources: Ports,
    inner_sinks: Ports,
    connections: Vec<Connection>,
}

impl ExecutionUnit {
    /// Create empty unit
    #[must_use]
    pub fn new(name: impl Into<String>, inner_sources: Ports, inner_sinks: Ports) -> Self {
        Self {
            name: name.into(),
            expanded: true,
            operators: Vec::new(),
            inner_sources,
            inner_sinks,
            connections: Vec::new(),
        }
    }

    /// Unit with open boundary groups (placeholder operators)
    #[inline]
    #[must_use]
    pub fn open(name: impl Into<String>) -> Self {
        Self::new(
            name,
            Ports::open(PortDirection::Output),
            Ports::open(PortDirection::Input),
        )
    }

    /// Unit name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the unit is shown expanded
    #[inline]
    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Set expanded flag
    #[inline]
    pub fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }

    /// Operators in declaration order
    #[inline]
    #[must_use]
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// Mutable operators (length is fixed through this view)
    #[inline]
    pub fn operators_mut(&mut self) -> &mut [Operator] {
        &mut self.operators
    }

    /// Operator by index
    #[inline]
    #[must_use]
    pub fn operator(&self, index: usize) -> Option<&Operator> {
        self.operators.get(index)
    }

    /// Index of operator named `name`
    #[inline]
    #[must_use]
    pub fn position_of_name(&self, name: &str) -> Option<usize> {
        self.operators.iter().position(|op| op.name == name)
    }

    /// Index of operator with `id`
    #[inline]
    #[must_use]
    pub fn position_of(&self, id: OperatorId) -> Option<usize> {
        self.operators.iter().position(|op| op.id == id)
    }

    /// Inner source ports (data entering the unit)
    #[inline]
    #[must_use]
    pub fn inner_sources(&self) -> &Ports {
        &self.inner_sources
    }

    /// Inner sink ports (data leaving the unit)
    #[inline]
    #[must_use]
    pub fn inner_sinks(&self) -> &Ports {
        &self.inner_sinks
    }

    /// Connections in insertion order
    #[inline]
    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Name not yet used by any operator in this unit
    ///
    /// Returns `base` if free, otherwise `"base (n)"` with the smallest free `n >= 2`.
    #[must_use]
    pub fn unique_name(&self, base: &str) -> String {
        if self.position_of_name(base).is_none() {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base} ({n})"))
            .find(|candidate| self.position_of_name(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    /// Append an operator, making its name unique
    ///
    /// Returns the new index and the original name if it had to be changed.
    pub fn add_operator(&mut self, mut operator: Operator) -> (usize, Option<String>) {
        let unique = self.unique_name(&operator.name);
        let renamed = (unique != operator.name).then(|| std::mem::replace(&mut operator.name, unique));
        self.operators.push(operator);
        (self.operators.len() - 1, renamed)
    }

    /// Insert an operator at `index`, shifting later operators and their connections
    ///
    /// # Errors
    /// Returns error if `index` is past the end.
    pub fn insert_operator(&mut self, index: usize, mut operator: Operator) -> GraphResult<Option<String>> {
        if index > self.operators.len() {
            return Err(GraphError::NoSuchOperator(index));
        }
        let unique = self.unique_name(&operator.name);
        let renamed = (unique != operator.name).then(|| std::mem::replace(&mut operator.name, unique));
        self.operators.insert(index, operator);
        for connection in &mut self.connections {
            for endpoint in [&mut connection.from, &mut connection.to] {
                if let NodeRef::Operator(i) = &mut endpoint.node {
                    if *i >= index {
                        *i += 1;
                    }
                }
            }
        }
        Ok(renamed)
    }

    /// Remove an operator and every connection touching it
    ///
    /// # Errors
    /// Returns error if `index` is out of range.
    pub fn remove_operator(&mut self, index: usize) -> GraphResult<Operator> {
        if index >= self.operators.len() {
            return Err(GraphError::NoSuchOperator(index));
        }
        let node = NodeRef::Operator(index);
        self.connections.retain(|c| c.from.node != node && c.to.node != node);
        for connection in &mut self.connections {
            for endpoint in [&mut connection.from, &mut connection.to] {
                if let NodeRef::Operator(i) = &mut endpoint.node {
                    if *i > index {
                        *i -= 1;
                    }
                }
            }
        }
        Ok(self.operators.remove(index))
    }

    /// Output-side ports of a node (operator outputs or inner sources)
    #[must_use]
    pub fn source_ports(&self, node: NodeRef) -> Option<&Ports> {
        match node {
            NodeRef::Boundary => Some(&self.inner_sources),
            NodeRef::Operator(i) => self.operators.get(i).map(|op| &op.outputs),
        }
    }

    /// Input-side ports of a node (operator inputs or inner sinks)
    #[must_use]
    pub fn sink_ports(&self, node: NodeRef) -> Option<&Ports> {
        match node {
            NodeRef::Boundary => Some(&self.inner_sinks),
            NodeRef::Operator(i) => self.operators.get(i).map(|op| &op.inputs),
        }
    }

    /// Mutable output-side ports of a node
    pub fn source_ports_mut(&mut self, node: NodeRef) -> Option<&mut Ports> {
        match node {
            NodeRef::Boundary => Some(&mut self.inner_sources),
            NodeRef::Operator(i) => self.operators.get_mut(i).map(|op| &mut op.outputs),
        }
    }

    /// Mutable input-side ports of a node
    pub fn sink_ports_mut(&mut self, node: NodeRef) -> Option<&mut Ports> {
        match node {
            NodeRef::Boundary => Some(&mut self.inner_sinks),
            NodeRef::Operator(i) => self.operators.get_mut(i).map(|op| &mut op.inputs),
        }
    }

    /// Whether an output endpoint already feeds something
    #[inline]
    #[must_use]
    pub fn is_source_connected(&self, from: Endpoint) -> bool {
        self.connections.iter().any(|c| c.from == from)
    }

    /// Whether an input endpoint already receives something
    #[inline]
    #[must_use]
    pub fn is_sink_connected(&self, to: Endpoint) -> bool {
        self.connections.iter().any(|c| c.to == to)
    }

    /// Output endpoint wired into `to`
    #[inline]
    #[must_use]
    pub fn source_of(&self, to: Endpoint) -> Option<Endpoint> {
        self.connections.iter().find(|c| c.to == to).map(|c| c.from)
    }

    /// Input endpoint fed by `from`
    #[inline]
    #[must_use]
    pub fn target_of(&self, from: Endpoint) -> Option<Endpoint> {
        self.connections.iter().find(|c| c.from == from).map(|c| c.to)
    }

    /// Wire `from` (output side) to `to` (input side)
    ///
    /// # Errors
    /// Returns error if either endpoint does not exist or is already connected.
    pub fn connect(&mut self, from: Endpoint, to: Endpoint) -> GraphResult<()> {
        let source = self
            .source_ports(from.node)
            .ok_or_else(|| node_error(from.node))?;
        let source_name = source
            .get(from.port)
            .ok_or(GraphError::PortIndexOutOfRange(from.port))?
            .name()
            .to_string();
        let sink = self.sink_ports(to.node).ok_or_else(|| node_error(to.node))?;
        let sink_name = sink
            .get(to.port)
            .ok_or(GraphError::PortIndexOutOfRange(to.port))?
            .name()
            .to_string();

        if self.is_source_connected(from) {
            return Err(GraphError::AlreadyConnected {
                direction: PortDirection::Output,
                name: source_name,
            });
        }
        if self.is_sink_connected(to) {
            return Err(GraphError::AlreadyConnected {
                direction: PortDirection::Input,
                name: sink_name,
            });
        }

        self.connections.push(Connection { from, to });
        Ok(())
    }

    /// Remove every connection touching `node`
    pub fn disconnect_node(&mut self, node: NodeRef) {
        self.connections.retain(|c| c.from.node != node && c.to.node != node);
    }

    /// Take all operators and connections out of the unit
    ///
    /// Boundary ports stay in place.
    pub fn take_contents(&mut self) -> (Vec<Operator>, Vec<Connection>) {
        (
            std::mem::take(&mut self.operators),
            std::mem::take(&mut self.connections),
        )
    }

    /// Swap everything but the name with `other`
    pub fn swap_contents(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.expanded, &mut other.expanded);
        std::mem::swap(&mut self.operators, &mut other.operators);
        std::mem::swap(&mut self.inner_sources, &mut other.inner_sources);
        std::mem::swap(&mut self.inner_sinks, &mut other.inner_sinks);
        std::mem::swap(&mut self.connections, &mut other.connections);
    }

    /// Describe connections by operator and port names
    #[must_use]
    pub fn named_connections(&self) -> Vec<NamedConnection> {
        self.connections
            .iter()
            .filter_map(|c| {
                Some(NamedConnection {
                    from_op: self.node_name(c.from.node),
                    from_port: self.source_ports(c.from.node)?.get(c.from.port)?.name().to_string(),
                    to_op: self.node_name(c.to.node),
                    to_port: self.sink_ports(c.to.node)?.get(c.to.port)?.name().to_string(),
                })
            })
            .collect()
    }

    fn node_name(&self, node: NodeRef) -> Option<String> {
        match node {
            NodeRef::Boundary => None,
            NodeRef::Operator(i) => self.operators.get(i).map(|op| op.name.clone()),
        }
    }

    /// Lock boundary groups and all nested groups
    pub fn lock_extenders(&mut self) {
        self.inner_sources.lock();
        self.inner_sinks.lock();
        for operator in &mut self.operators {
            operator.lock_extenders();
        }
    }
}

fn node_error(node: NodeRef) -> GraphError {
    match node {
        NodeRef::Operator(i) => GraphError::NoSuchOperator(i),
        NodeRef::Boundary => GraphError::NoSuchOperator(usize::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::OperatorId;
    use crate::port::{ExtenderSpec, PortSpec};

    fn op(id: u64, name: &str) -> Operator {
        Operator::new(
            OperatorId::new(id),
            name,
            "noop",
            Ports::new(PortDirection::Input, &[PortSpec::any("in")], None),
            Ports::new(PortDirection::Output, &[PortSpec::any("out")], None),
        )
    }

    fn unit() -> ExecutionUnit {
        ExecutionUnit::new(
            "Main",
            Ports::new(PortDirection::Output, &[], Some(&ExtenderSpec::any("in"))),
            Ports::new(PortDirection::Input, &[], Some(&ExtenderSpec::any("out"))),
        )
    }

    #[test]
    fn add_operator_makes_names_unique() {
        let mut unit = unit();
        assert_eq!(unit.add_operator(op(1, "A")), (0, None));
        assert_eq!(unit.add_operator(op(2, "A")), (1, Some("A".to_string())));
        assert_eq!(unit.add_operator(op(3, "A")), (2, Some("A".to_string())));
        let names: Vec<_> = unit.operators().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["A", "A (2)", "A (3)"]);
    }

    #[test]
    fn connect_and_query() {
        let mut unit = unit();
        unit.add_operator(op(1, "A"));
        unit.add_operator(op(2, "B"));
        unit.connect(Endpoint::operator(0, 0), Endpoint::operator(1, 0)).unwrap();

        assert!(unit.is_source_connected(Endpoint::operator(0, 0)));
        assert_eq!(unit.source_of(Endpoint::operator(1, 0)), Some(Endpoint::operator(0, 0)));

        let named = unit.named_connections();
        assert_eq!(named.len(), 1);
        assert_eq!(named[0].from_op.as_deref(), Some("A"));
        assert_eq!(named[0].to_port, "in");
    }

    #[test]
    fn connect_rejects_second_counterpart() {
        let mut unit = unit();
        unit.add_operator(op(1, "A"));
        unit.add_operator(op(2, "B"));
        unit.add_operator(op(3, "C"));
        unit.connect(Endpoint::operator(0, 0), Endpoint::operator(1, 0)).unwrap();
        let err = unit
            .connect(Endpoint::operator(2, 0), Endpoint::operator(1, 0))
            .unwrap_err();
        assert!(matches!(err, GraphError::AlreadyConnected { direction: PortDirection::Input, .. }));
    }

    #[test]
    fn remove_operator_shifts_connections() {
        let mut unit = unit();
        unit.add_operator(op(1, "A"));
        unit.add_operator(op(2, "B"));
        unit.add_operator(op(3, "C"));
        unit.connect(Endpoint::operator(0, 0), Endpoint::operator(1, 0)).unwrap();
        unit.connect(Endpoint::operator(1, 0), Endpoint::operator(2, 0)).unwrap();
        unit.connect(Endpoint::boundary(0), Endpoint::operator(0, 0)).unwrap();

        let removed = unit.remove_operator(0).unwrap();
        assert_eq!(removed.name, "A");
        assert_eq!(
            unit.connections(),
            &[Connection {
                from: Endpoint::operator(0, 0),
                to: Endpoint::operator(1, 0),
            }]
        );
    }

    #[test]
    fn insert_operator_shifts_connections() {
        let mut unit = unit();
        unit.add_operator(op(1, "A"));
        unit.add_operator(op(2, "B"));
        unit.connect(Endpoint::operator(0, 0), Endpoint::operator(1, 0)).unwrap();
        unit.insert_operator(1, op(3, "X")).unwrap();
        assert_eq!(
            unit.connections(),
            &[Connection {
                from: Endpoint::operator(0, 0),
                to: Endpoint::operator(2, 0),
            }]
        );
    }

    #[test]
    fn boundary_connections() {
        let mut unit = unit();
        unit.add_operator(op(1, "A"));
        unit.connect(Endpoint::boundary(0), Endpoint::operator(0, 0)).unwrap();
        unit.connect(Endpoint::operator(0, 0), Endpoint::boundary(0)).unwrap();
        let named = unit.named_connections();
        assert_eq!(named[0].from_op, None);
        assert_eq!(named[0].from_port, "in 1");
        assert_eq!(named[1].to_op, None);
        assert_eq!(named[1].to_port, "out 1");
    }
}
