//! Operator instances
//!
//! An [`Operator`] is one node of the process graph. Composite operators own
//! nested [`ExecutionUnit`]s, so the whole graph is a tree rooted at the
//! process operator; connections live inside the units.

use crate::port::Ports;
use crate::parameter::Parameters;
use crate::unit::ExecutionUnit;
use crate::version::VersionNumber;
use indexmap::IndexMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Identifier of an operator, unique within one imported graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperatorId(u64);

impl OperatorId {
    /// Wrap a raw id
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id value
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for OperatorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sequential id source for one graph
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Create allocator starting at zero
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator continuing after every id used in `root`
    #[must_use]
    pub fn after(root: &Operator) -> Self {
        let mut max = root.id.get();
        root.walk(&mut |op| max = max.max(op.id.get()));
        Self { next: max + 1 }
    }

    /// Next free id
    #[inline]
    pub fn allocate(&mut self) -> OperatorId {
        let id = OperatorId(self.next);
        self.next += 1;
        id
    }
}

/// Breakpoint position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Breakpoint {
    /// Pause before the operator runs
    Before,
    /// Pause after the operator ran
    After,
}

impl Breakpoint {
    /// Markup token
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl FromStr for Breakpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            other => Err(other.to_string()),
        }
    }
}

/// One operator instance
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    /// Graph-unique identifier
    pub id: OperatorId,
    /// Name, unique within the containing unit
    pub name: String,
    /// Resolved type key
    pub type_key: String,
    /// Original key of an unknown type kept by a placeholder
    pub original_key: Option<String>,
    /// Working compatibility version
    pub compatibility: VersionNumber,
    /// Whether the operator is enabled
    pub enabled: bool,
    /// Whether the operator is shown expanded
    pub expanded: bool,
    /// Breakpoints, sorted and unique
    pub breakpoints: Vec<Breakpoint>,
    /// Explicitly set parameters
    pub parameters: Parameters,
    /// Input ports
    pub inputs: Ports,
    /// Output ports
    pub outputs: Ports,
    /// Nested execution units
    pub units: Vec<ExecutionUnit>,
    /// Attributes owned by document filters
    pub auxiliary: IndexMap<String, String>,
}

impl Operator {
    /// Create operator with default flags and no parameters
    #[must_use]
    pub fn new(id: OperatorId, name: impl Into<String>, type_key: impl Into<String>, inputs: Ports, outputs: Ports) -> Self {
        Self {
            id,
            name: name.into(),
            type_key: type_key.into(),
            original_key: None,
            compatibility: VersionNumber::default(),
            enabled: true,
            expanded: true,
            breakpoints: Vec::new(),
            parameters: Parameters::new(),
            inputs,
            outputs,
            units: Vec::new(),
            auxiliary: IndexMap::new(),
        }
    }

    /// Key written back on export
    #[inline]
    #[must_use]
    pub fn export_key(&self) -> &str {
        self.original_key.as_deref().unwrap_or(&self.type_key)
    }

    /// Whether this operator stands in for an unknown type
    #[inline]
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.original_key.is_some()
    }

    /// Add a breakpoint, keeping the list sorted and unique
    pub fn add_breakpoint(&mut self, breakpoint: Breakpoint) {
        if let Err(pos) = self.breakpoints.binary_search(&breakpoint) {
            self.breakpoints.insert(pos, breakpoint);
        }
    }

    /// Visit every operator below this one, depth-first, in declaration order
    pub fn walk(&self, visit: &mut impl FnMut(&Operator)) {
        for unit in &self.units {
            for operator in unit.operators() {
                visit(operator);
                operator.walk(visit);
            }
        }
    }

    /// Number of operators in this subtree, including `self`
    #[must_use]
    pub fn subtree_size(&self) -> usize {
        let mut count = 1;
        self.walk(&mut |_| count += 1);
        count
    }

    /// Find an operator in this subtree by id
    #[must_use]
    pub fn find(&self, id: OperatorId) -> Option<&Operator> {
        if self.id == id {
            return Some(self);
        }
        self.units
            .iter()
            .flat_map(ExecutionUnit::operators)
            .find_map(|op| op.find(id))
    }

    /// Find an operator in this subtree by id, mutably
    pub fn find_mut(&mut self, id: OperatorId) -> Option<&mut Operator> {
        if self.id == id {
            return Some(self);
        }
        for unit in &mut self.units {
            for operator in unit.operators_mut() {
                if let Some(found) = operator.find_mut(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Unit directly containing operator `id`, with the operator's index
    pub fn containing_unit_mut(&mut self, id: OperatorId) -> Option<(&mut ExecutionUnit, usize)> {
        for unit in &mut self.units {
            if let Some(index) = unit.position_of(id) {
                return Some((unit, index));
            }
            for operator in unit.operators_mut() {
                if let Some(found) = operator.containing_unit_mut(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Find the first operator named `name` in this subtree
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Operator> {
        if self.name == name {
            return Some(self);
        }
        self.units
            .iter()
            .flat_map(ExecutionUnit::operators)
            .find_map(|op| op.find_by_name(name))
    }

    /// Lock all port groups in this subtree
    pub fn lock_extenders(&mut self) {
        self.inputs.lock();
        self.outputs.lock();
        for unit in &mut self.units {
            unit.lock_extenders();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{PortDirection, PortSpec};
    use crate::unit::ExecutionUnit;

    fn leaf(id: u64, name: &str) -> Operator {
        Operator::new(
            OperatorId::new(id),
            name,
            "leaf",
            Ports::new(PortDirection::Input, &[PortSpec::any("in")], None),
            Ports::new(PortDirection::Output, &[PortSpec::any("out")], None),
        )
    }

    fn tree() -> Operator {
        let mut root = leaf(0, "Process");
        let mut main = ExecutionUnit::open("Main Process");
        let mut chain = leaf(1, "Chain");
        let mut inner = ExecutionUnit::open("Inner");
        inner.add_operator(leaf(2, "Deep"));
        chain.units.push(inner);
        main.add_operator(chain);
        main.add_operator(leaf(3, "Sibling"));
        root.units.push(main);
        root
    }

    #[test]
    fn walk_visits_depth_first() {
        let root = tree();
        let mut names = Vec::new();
        root.walk(&mut |op| names.push(op.name.clone()));
        assert_eq!(names, vec!["Chain", "Deep", "Sibling"]);
        assert_eq!(root.subtree_size(), 4);
    }

    #[test]
    fn find_by_id_and_name() {
        let mut root = tree();
        assert_eq!(root.find(OperatorId::new(2)).map(|o| o.name.as_str()), Some("Deep"));
        assert!(root.find_by_name("Sibling").is_some());
        root.find_mut(OperatorId::new(2)).unwrap().enabled = false;
        assert!(!root.find_by_name("Deep").unwrap().enabled);
    }

    #[test]
    fn containing_unit() {
        let mut root = tree();
        let (unit, index) = root.containing_unit_mut(OperatorId::new(3)).unwrap();
        assert_eq!(unit.name(), "Main Process");
        assert_eq!(index, 1);
        let (unit, index) = root.containing_unit_mut(OperatorId::new(2)).unwrap();
        assert_eq!(unit.name(), "Inner");
        assert_eq!(index, 0);
        assert!(root.containing_unit_mut(OperatorId::new(0)).is_none());
    }

    #[test]
    fn breakpoints_sorted_unique() {
        let mut op = leaf(0, "A");
        op.add_breakpoint(Breakpoint::After);
        op.add_breakpoint(Breakpoint::Before);
        op.add_breakpoint(Breakpoint::After);
        assert_eq!(op.breakpoints, vec![Breakpoint::Before, Breakpoint::After]);
    }

    #[test]
    fn id_allocator_continues_after_tree() {
        let root = tree();
        let mut ids = IdAllocator::after(&root);
        assert_eq!(ids.allocate(), OperatorId::new(4));
    }

    #[test]
    fn export_key_prefers_original() {
        let mut op = leaf(0, "A");
        assert_eq!(op.export_key(), "leaf");
        op.original_key = Some("legacy_thing".into());
        assert!(op.is_placeholder());
        assert_eq!(op.export_key(), "legacy_thing");
    }
}
