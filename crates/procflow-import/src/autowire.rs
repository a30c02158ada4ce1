//! Automatic data-flow construction inside one execution unit
//!
//! Outputs are kept on a stack in the order they become available, starting
//! with the unit's inner sources. Walking the operators in declaration
//! order, every unconnected input takes the most recent unused output whose
//! data type it accepts. Outputs still unused at the end feed the unit's
//! unconnected inner sinks, growing the sink extender where the group allows.

use procflow_model::{accepts, Endpoint, ExecutionUnit, NodeRef, Ports};
use tracing::debug;

/// Wire unconnected ports of `unit`, returning the number of new connections
pub fn wire_unit(unit: &mut ExecutionUnit) -> usize {
    let mut available: Vec<(Endpoint, String)> = Vec::new();
    let mut created = 0;

    push_unused_outputs(unit, NodeRef::Boundary, &mut available);

    for index in 0..unit.operators().len() {
        let node = NodeRef::Operator(index);
        let inputs: Vec<(usize, String)> = port_types(&unit.operators()[index].inputs);
        for (port, input_type) in inputs {
            let to = Endpoint { node, port };
            if unit.is_sink_connected(to) {
                continue;
            }
            let Some(position) = available.iter().rposition(|(_, output_type)| accepts(&input_type, output_type)) else {
                continue;
            };
            let (from, _) = available.remove(position);
            if unit.connect(from, to).is_ok() {
                created += 1;
            }
        }
        push_unused_outputs(unit, node, &mut available);
    }

    for (from, output_type) in available {
        if from.node == NodeRef::Boundary {
            continue;
        }
        if let Some(to) = free_sink(unit, &output_type) {
            if unit.connect(from, to).is_ok() {
                created += 1;
            }
        }
    }

    debug!(unit = unit.name(), created, "automatic wiring finished");
    created
}

fn port_types(ports: &Ports) -> Vec<(usize, String)> {
    ports
        .iter()
        .enumerate()
        .map(|(i, p)| (i, p.data_type().to_string()))
        .collect()
}

fn push_unused_outputs(unit: &ExecutionUnit, node: NodeRef, available: &mut Vec<(Endpoint, String)>) {
    let Some(ports) = unit.source_ports(node) else {
        return;
    };
    for (port, data_type) in port_types(ports) {
        let from = Endpoint { node, port };
        if !unit.is_source_connected(from) {
            available.push((from, data_type));
        }
    }
}

/// First unconnected inner sink accepting `output_type`, growing the extender if needed
fn free_sink(unit: &mut ExecutionUnit, output_type: &str) -> Option<Endpoint> {
    let existing = unit.inner_sinks().iter().enumerate().find_map(|(port, p)| {
        let to = Endpoint::boundary(port);
        (!unit.is_sink_connected(to) && accepts(p.data_type(), output_type)).then_some(to)
    });
    if existing.is_some() {
        return existing;
    }

    let sinks = unit.sink_ports_mut(NodeRef::Boundary)?;
    if !sinks.extender().is_some_and(|spec| accepts(&spec.data_type, output_type)) {
        return None;
    }
    sinks.grow_next().ok().map(Endpoint::boundary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use procflow_model::{ExtenderSpec, Operator, OperatorId, PortDirection, PortSpec};

    fn op(id: u64, name: &str, inputs: &[PortSpec], outputs: &[PortSpec]) -> Operator {
        Operator::new(
            OperatorId::new(id),
            name,
            "op",
            Ports::new(PortDirection::Input, inputs, None),
            Ports::new(PortDirection::Output, outputs, None),
        )
    }

    fn unit() -> ExecutionUnit {
        ExecutionUnit::new(
            "Main",
            Ports::new(PortDirection::Output, &[], Some(&ExtenderSpec::any("input"))),
            Ports::new(PortDirection::Input, &[], Some(&ExtenderSpec::any("result"))),
        )
    }

    fn wiring(unit: &ExecutionUnit) -> Vec<String> {
        unit.named_connections()
            .into_iter()
            .map(|c| {
                format!(
                    "{}.{} -> {}.{}",
                    c.from_op.unwrap_or_default(),
                    c.from_port,
                    c.to_op.unwrap_or_default(),
                    c.to_port
                )
            })
            .collect()
    }

    #[test]
    fn chain_is_wired_in_order() {
        let mut unit = unit();
        unit.add_operator(op(1, "Read", &[], &[PortSpec::new("output", "ExampleSet")]));
        unit.add_operator(op(
            2,
            "Filter",
            &[PortSpec::new("example set input", "ExampleSet")],
            &[PortSpec::new("example set output", "ExampleSet")],
        ));
        unit.add_operator(op(3, "Learn", &[PortSpec::new("training set", "ExampleSet")], &[PortSpec::new("model", "Model")]));

        // input 1 of the boundary is consumed by nothing: Read has no inputs
        assert_eq!(wire_unit(&mut unit), 3);
        assert_eq!(
            wiring(&unit),
            vec![
                "Read.output -> Filter.example set input",
                "Filter.example set output -> Learn.training set",
                "Learn.model -> .result 1",
            ]
        );
    }

    #[test]
    fn incompatible_types_are_skipped() {
        let mut unit = unit();
        unit.add_operator(op(1, "Learn", &[], &[PortSpec::new("model", "Model")]));
        unit.add_operator(op(2, "Read", &[], &[PortSpec::new("output", "ExampleSet")]));
        unit.add_operator(op(3, "Apply", &[PortSpec::new("model", "Model")], &[]));

        wire_unit(&mut unit);
        assert_eq!(wiring(&unit)[0], "Learn.model -> Apply.model");
        assert_eq!(wiring(&unit)[1], "Read.output -> .result 1");
    }

    #[test]
    fn inner_sources_feed_first_inputs() {
        let mut unit = unit();
        unit.add_operator(op(1, "A", &[PortSpec::any("in")], &[]));
        wire_unit(&mut unit);
        assert_eq!(wiring(&unit), vec![".input 1 -> A.in"]);
    }

    #[test]
    fn existing_connections_are_kept() {
        let mut unit = unit();
        unit.add_operator(op(1, "A", &[], &[PortSpec::any("out")]));
        unit.add_operator(op(2, "B", &[PortSpec::any("in")], &[]));
        unit.connect(Endpoint::operator(0, 0), Endpoint::operator(1, 0)).unwrap();
        assert_eq!(wire_unit(&mut unit), 0);
    }

    #[test]
    fn sinks_grow_only_for_accepted_types() {
        let mut unit = ExecutionUnit::new(
            "Main",
            Ports::empty(PortDirection::Output),
            Ports::new(
                PortDirection::Input,
                &[],
                Some(&ExtenderSpec {
                    prefix: "model".into(),
                    data_type: "Model".into(),
                }),
            ),
        );
        unit.add_operator(op(1, "Read", &[], &[PortSpec::new("output", "ExampleSet")]));
        unit.add_operator(op(2, "Learn", &[], &[PortSpec::new("model", "Model")]));

        assert_eq!(wire_unit(&mut unit), 1);
        assert_eq!(wiring(&unit), vec!["Learn.model -> .model 1"]);
        assert_eq!(unit.inner_sinks().len(), 1);
    }

    #[test]
    fn locked_sinks_do_not_grow() {
        let mut unit = unit();
        unit.add_operator(op(1, "A", &[], &[PortSpec::any("a"), PortSpec::any("b")]));
        unit.lock_extenders();
        assert_eq!(wire_unit(&mut unit), 1);
        assert_eq!(unit.inner_sinks().len(), 1);
    }
}
