//! Operator factories
//!
//! Every registered type pairs a descriptor with an [`OperatorFactory`]. The
//! default [`DescriptorFactory`] builds instances straight from the
//! descriptor; plugins may register their own factory to customize the
//! initial state of new instances.

use crate::descriptor::OperatorDescriptor;
use procflow_model::{ExecutionUnit, Operator, OperatorId, PortDirection, Ports};

/// Creates fresh operator instances of one type
pub trait OperatorFactory: Send + Sync {
    /// Build a new instance named `name` with id `id`
    fn instantiate(&self, descriptor: &OperatorDescriptor, id: OperatorId, name: &str) -> Operator;
}

impl<F> OperatorFactory for F
where
    F: Fn(&OperatorDescriptor, OperatorId, &str) -> Operator + Send + Sync,
{
    fn instantiate(&self, descriptor: &OperatorDescriptor, id: OperatorId, name: &str) -> Operator {
        self(descriptor, id, name)
    }
}

/// Factory deriving ports and units from the descriptor
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorFactory;

impl OperatorFactory for DescriptorFactory {
    fn instantiate(&self, descriptor: &OperatorDescriptor, id: OperatorId, name: &str) -> Operator {
        let mut operator = Operator::new(
            id,
            name,
            descriptor.key.clone(),
            descriptor.input_ports(),
            descriptor.output_ports(),
        );
        operator.compatibility = descriptor.latest_version.clone();
        operator.units = descriptor.subprocesses.iter().map(|s| s.instantiate()).collect();
        operator
    }
}

/// Type key given to placeholder instances
pub const PLACEHOLDER_KEY: &str = "placeholder";

/// Build a placeholder standing in for the unknown type `original_key`
///
/// Placeholders have open port groups so every connection of the original
/// document can be kept, and `units` open execution units.
#[must_use]
pub fn placeholder(id: OperatorId, name: &str, original_key: &str, units: usize) -> Operator {
    let mut operator = Operator::new(
        id,
        name,
        PLACEHOLDER_KEY,
        Ports::open(PortDirection::Input),
        Ports::open(PortDirection::Output),
    );
    operator.original_key = Some(original_key.to_string());
    operator.units = (1..=units).map(|n| ExecutionUnit::open(format!("Subprocess {n}"))).collect();
    operator
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SubprocessSpec;
    use procflow_model::{PortSpec, VersionNumber};

    #[test]
    fn descriptor_factory_builds_ports_and_units() {
        let descriptor = OperatorDescriptor::new("loop", VersionNumber::new(9, 0, 0))
            .with_input(PortSpec::any("input"))
            .with_subprocess(SubprocessSpec::extending("Iteration", "in", "out"));
        let op = DescriptorFactory.instantiate(&descriptor, OperatorId::new(4), "Loop");

        assert_eq!(op.name, "Loop");
        assert_eq!(op.type_key, "loop");
        assert_eq!(op.compatibility, VersionNumber::new(9, 0, 0));
        assert_eq!(op.inputs.position("input"), Some(0));
        assert_eq!(op.units.len(), 1);
        assert_eq!(op.units[0].name(), "Iteration");
    }

    #[test]
    fn closures_are_factories() {
        let descriptor = OperatorDescriptor::new("custom", VersionNumber::new(9, 0, 0));
        let factory = |d: &OperatorDescriptor, id: OperatorId, name: &str| {
            let mut op = DescriptorFactory.instantiate(d, id, name);
            op.expanded = false;
            op
        };
        let op = factory.instantiate(&descriptor, OperatorId::new(1), "C");
        assert!(!op.expanded);
    }

    #[test]
    fn placeholder_keeps_original_key() {
        let mut op = placeholder(OperatorId::new(2), "Old", "legacy:thing", 2);
        assert!(op.is_placeholder());
        assert_eq!(op.export_key(), "legacy:thing");
        assert_eq!(op.units.len(), 2);
        assert_eq!(op.inputs.get_or_grow("anything").unwrap(), 0);
    }
}
