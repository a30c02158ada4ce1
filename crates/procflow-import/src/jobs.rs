//! Post-construction jobs
//!
//! Jobs run after the whole operator tree exists: first the automatic wiring
//! queued for legacy layouts, then the jobs recorded by migration rules in
//! the order they were recorded. Jobs find their operator by id, so earlier
//! jobs may restructure the tree freely.

use crate::autowire::wire_unit;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use procflow_model::{Connection, Endpoint, NodeRef, Operator, OperatorId};
use procflow_rules::DeferredJob;
use tracing::debug;

/// Ordered post-construction jobs
#[derive(Debug, Default)]
pub(crate) struct JobQueue {
    legacy: Vec<DeferredJob>,
    recorded: Vec<DeferredJob>,
}

impl JobQueue {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue automatic wiring of a unit that received legacy children
    #[inline]
    pub(crate) fn push_legacy(&mut self, operator: OperatorId, unit: usize) {
        self.legacy.push(DeferredJob::AutoWire {
            operator,
            unit: Some(unit),
        });
    }

    /// Queue jobs recorded by migration rules
    #[inline]
    pub(crate) fn extend_recorded(&mut self, jobs: impl IntoIterator<Item = DeferredJob>) {
        self.recorded.extend(jobs);
    }

    /// Number of queued jobs
    #[inline]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.legacy.len() + self.recorded.len()
    }

    /// Run every job against the tree rooted at `root`
    pub(crate) fn run(self, root: &mut Operator, diagnostics: &mut Diagnostics) {
        debug!(jobs = self.len(), legacy = self.legacy.len(), "running post-construction jobs");
        for job in self.legacy.into_iter().chain(self.recorded) {
            run_job(&job, root, diagnostics);
        }
    }
}

fn run_job(job: &DeferredJob, root: &mut Operator, diagnostics: &mut Diagnostics) {
    match *job {
        DeferredJob::AutoWire { operator, unit } => auto_wire(root, operator, unit, diagnostics),
        DeferredJob::ExchangeUnits { operator, first, second } => exchange(root, operator, first, second, diagnostics),
        DeferredJob::Unwrap { operator } => unwrap(root, operator, diagnostics),
    }
}

fn missing(diagnostics: &mut Diagnostics, job: &str, operator: OperatorId) {
    diagnostics.push(
        DiagnosticKind::JobFailed,
        None,
        format!("Cannot {job}: operator {operator} no longer exists"),
    );
}

fn auto_wire(root: &mut Operator, id: OperatorId, unit: Option<usize>, diagnostics: &mut Diagnostics) {
    let Some(operator) = root.find_mut(id) else {
        return missing(diagnostics, "wire data flow automatically", id);
    };
    let range = match unit {
        Some(index) if index < operator.units.len() => index..index + 1,
        Some(index) => {
            let name = operator.name.clone();
            return diagnostics.push(
                DiagnosticKind::JobFailed,
                Some(&name),
                format!("Cannot wire execution unit {index} of '{name}': no such unit"),
            );
        }
        None => 0..operator.units.len(),
    };
    for unit in &mut operator.units[range] {
        wire_unit(unit);
    }
}

fn exchange(root: &mut Operator, id: OperatorId, first: usize, second: usize, diagnostics: &mut Diagnostics) {
    let Some(operator) = root.find_mut(id) else {
        return missing(diagnostics, "exchange execution units", id);
    };
    let (low, high) = (first.min(second), first.max(second));
    if low == high {
        return;
    }
    if high >= operator.units.len() {
        let name = operator.name.clone();
        return diagnostics.push(
            DiagnosticKind::JobFailed,
            Some(&name),
            format!("Cannot exchange execution units {first} and {second} of '{name}': no such unit"),
        );
    }
    let (head, tail) = operator.units.split_at_mut(high);
    head[low].swap_contents(&mut tail[0]);
}

/// Remove the wrapper `id` and splice its first unit into the parent unit
fn unwrap(root: &mut Operator, id: OperatorId, diagnostics: &mut Diagnostics) {
    let Some((parent, index)) = root.containing_unit_mut(id) else {
        return missing(diagnostics, "remove wrapper operator", id);
    };

    // Outer counterparts of the wrapper's ports, by port index
    let incoming: Vec<(usize, Endpoint)> = parent
        .connections()
        .iter()
        .filter(|c| c.to.node == NodeRef::Operator(index))
        .map(|c| (c.to.port, c.from))
        .collect();
    let outgoing: Vec<(usize, Endpoint)> = parent
        .connections()
        .iter()
        .filter(|c| c.from.node == NodeRef::Operator(index))
        .map(|c| (c.from.port, c.to))
        .collect();

    let mut wrapper = match parent.remove_operator(index) {
        Ok(wrapper) => wrapper,
        Err(error) => {
            return diagnostics.push(DiagnosticKind::JobFailed, None, format!("Cannot remove wrapper operator: {error}"))
        }
    };
    if wrapper.units.len() > 1 {
        diagnostics.push(
            DiagnosticKind::JobFailed,
            Some(&wrapper.name),
            format!(
                "Wrapper '{}' has {} execution units, only the first was kept",
                wrapper.name,
                wrapper.units.len()
            ),
        );
    }
    let (inner, inner_connections) = match wrapper.units.first_mut() {
        Some(unit) => unit.take_contents(),
        None => (Vec::new(), Vec::new()),
    };
    let moved = inner.len();

    for (offset, operator) in inner.into_iter().enumerate() {
        match parent.insert_operator(index + offset, operator) {
            Ok(Some(original)) => diagnostics.push(
                DiagnosticKind::DuplicateName,
                Some(&original),
                format!("Operator '{original}' was renamed while removing wrapper '{}'", wrapper.name),
            ),
            Ok(None) => {}
            Err(error) => diagnostics.push(DiagnosticKind::JobFailed, Some(&wrapper.name), error.to_string()),
        }
    }

    // Outer endpoints shift by -1 for the wrapper and +moved for the inserted operators
    let outer = |endpoint: Endpoint| match endpoint.node {
        NodeRef::Operator(i) if i > index => Endpoint::operator(i - 1 + moved, endpoint.port),
        _ => endpoint,
    };
    let inner_endpoint = |endpoint: Endpoint| match endpoint.node {
        NodeRef::Operator(i) => Some(Endpoint::operator(index + i, endpoint.port)),
        NodeRef::Boundary => None,
    };
    let source_for = |port: usize| incoming.iter().find(|(p, _)| *p == port).map(|(_, e)| outer(*e));
    let target_for = |port: usize| outgoing.iter().find(|(p, _)| *p == port).map(|(_, e)| outer(*e));

    let spliced: Vec<Connection> = inner_connections
        .iter()
        .filter_map(|c| {
            let from = inner_endpoint(c.from).or_else(|| source_for(c.from.port))?;
            let to = inner_endpoint(c.to).or_else(|| target_for(c.to.port))?;
            Some(Connection { from, to })
        })
        .collect();

    for connection in spliced {
        if let Err(error) = parent.connect(connection.from, connection.to) {
            diagnostics.push(
                DiagnosticKind::Connection,
                Some(&wrapper.name),
                format!("Connection lost while removing wrapper '{}': {error}", wrapper.name),
            );
        }
    }
    debug!(wrapper = %wrapper.name, moved, "wrapper removed");
}
