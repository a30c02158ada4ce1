//! Graph builder
//!
//! Depth-first construction of an operator tree from its markup:
//!
//! 1. resolve the type key through the replacement table, falling back to a
//!    placeholder for unknown types
//! 2. instantiate and set name, compatibility level, flags and breakpoints
//! 3. read parameters and check them against the type's schema
//! 4. apply migration rules
//! 5. build nested execution units (or distribute legacy children)
//! 6. restore the connections of each unit once its operators exist
//!
//! When the tree is complete the queued jobs run and every extender is
//! locked.

use crate::config::ImportConfig;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::filter::{DocumentFilter, FILTER_OWNED_TAGS};
use crate::jobs::JobQueue;
use crate::markup::Element;
use crate::progress::{Progress, ProgressSink};
use procflow_model::{
    effective_declared, Breakpoint, CompatibilityHistory, DeclaredSource, DeclaredVersion, Endpoint, ExecutionUnit, IdAllocator,
    NodeRef, Operator, OperatorId, ParameterValue, PortLookup, VersionNumber, PROCESS_LAYOUT_VERSION,
};
use procflow_registry::{placeholder, OperatorRegistry, OperatorType, ResolvedKey};
use procflow_rules::{RuleContext, RuleEngine, RuleOutcome, RuleRegistry};
use std::sync::Arc;
use tracing::debug;

/// Shared, read-only inputs of one import
#[derive(Clone, Copy)]
pub(crate) struct BuildEnv<'a> {
    pub(crate) config: &'a ImportConfig,
    pub(crate) operators: &'a OperatorRegistry,
    pub(crate) rules: &'a RuleRegistry,
    pub(crate) filters: &'a [Arc<dyn DocumentFilter>],
    pub(crate) progress: Option<&'a dyn ProgressSink>,
}

/// Builds one operator tree
pub(crate) struct Builder<'a> {
    env: BuildEnv<'a>,
    rules: RuleEngine<'a>,
    root_version: Option<VersionNumber>,
    document_version: VersionNumber,
    ids: &'a mut IdAllocator,
    diagnostics: Diagnostics,
    jobs: JobQueue,
    legacy_flagged: bool,
    completed: usize,
    total: usize,
}

impl<'a> Builder<'a> {
    /// Create builder
    ///
    /// `root_version` is the enclosing document's version; fragments pass
    /// `None` and fall back to the software version.
    pub(crate) fn new(
        env: BuildEnv<'a>,
        root_version: Option<VersionNumber>,
        ids: &'a mut IdAllocator,
        diagnostics: Diagnostics,
    ) -> Self {
        let document_version = root_version
            .clone()
            .unwrap_or_else(|| env.config.software_version.clone());
        Self {
            env,
            rules: RuleEngine::new(env.rules),
            root_version,
            document_version,
            ids,
            diagnostics,
            jobs: JobQueue::new(),
            legacy_flagged: false,
            completed: 0,
            total: 0,
        }
    }

    /// Build the tree rooted at `element`, run queued jobs and lock extenders
    pub(crate) fn build(mut self, element: &Element) -> (Operator, Diagnostics) {
        self.total = 1 + element.count_descendants("operator");
        let mut root = self.build_operator(element);
        let jobs = std::mem::take(&mut self.jobs);
        jobs.run(&mut root, &mut self.diagnostics);
        root.lock_extenders();
        (root, self.diagnostics)
    }

    fn build_operator(&mut self, element: &Element) -> Operator {
        let key = element.attribute("class").unwrap_or_default();
        let name = match element.attribute("name") {
            Some(name) => name.to_string(),
            None => {
                self.diagnostics.push(
                    DiagnosticKind::Structure,
                    None,
                    format!("Operator of type '{key}' has no name, using the type key"),
                );
                key.to_string()
            }
        };

        let id = self.ids.allocate();
        let (mut operator, schema) = self.instantiate(id, &name, key, element);
        let history = schema.as_ref().map_or_else(
            || CompatibilityHistory::stable(self.env.config.software_version.clone()),
            |ty| ty.descriptor().history(),
        );

        let (declared, source) = self.declared_version(element, &name);
        let resolution = history.resolve(&declared);
        if resolution.is_pinned() {
            let origin = match source {
                DeclaredSource::Operator => "its compatibility level",
                DeclaredSource::Document => "the document version",
                DeclaredSource::Software => "the software version",
            };
            self.diagnostics.push(
                DiagnosticKind::BehaviorChanged,
                Some(&name),
                format!(
                    "Operator '{name}' keeps the behavior of version {} ({declared} declared by {origin}); \
                     the current behavior of version {} differs. Raise its compatibility level to upgrade",
                    resolution.working, resolution.latest
                ),
            );
        }
        operator.compatibility = resolution.working;
        operator.enabled = self.flag(element, "activated", &name);
        operator.expanded = self.flag(element, "expanded", &name);
        self.read_breakpoints(element, &mut operator);

        self.completed += 1;
        if let Some(progress) = self.env.progress {
            progress.report(Progress {
                completed: self.completed,
                total: self.total,
            });
        }

        self.read_parameters(element, &mut operator, schema.as_deref());
        // operators already at their type's latest version are never migrated
        if declared.is_before(history.latest()) {
            self.apply_rules(&mut operator, history.latest());
        }
        self.read_units(element, &mut operator);

        for filter in self.env.filters {
            filter.operator_imported(element, &mut operator);
        }
        debug!(name = %operator.name, key = operator.export_key(), compatibility = %operator.compatibility, "operator built");
        operator
    }

    fn instantiate(
        &mut self,
        id: OperatorId,
        name: &str,
        key: &str,
        element: &Element,
    ) -> (Operator, Option<Arc<OperatorType>>) {
        let resolved = self.env.operators.resolve_key(key).unwrap_or_else(|error| {
            self.diagnostics.push(DiagnosticKind::Structure, Some(name), error.to_string());
            ResolvedKey {
                key: key.to_string(),
                replaced_from: None,
            }
        });
        if let Some(deprecated) = &resolved.replaced_from {
            self.diagnostics.push_modification(
                DiagnosticKind::ReplacedOperator,
                Some(name),
                format!(
                    "Operator '{name}' of deprecated type '{deprecated}' was replaced by type '{}'",
                    resolved.key
                ),
            );
        }

        if let Some(ty) = self.env.operators.get(&resolved.key) {
            return (ty.instantiate(id, name), Some(Arc::clone(ty)));
        }

        self.diagnostics.push(
            DiagnosticKind::UnknownOperator,
            Some(name),
            format!("Unknown operator type '{key}' of operator '{name}'; a placeholder keeps its settings"),
        );
        let legacy_children = usize::from(element.child("operator").is_some());
        let units = element.children_named("process").count().max(legacy_children);
        (placeholder(id, name, key, units), None)
    }

    fn declared_version(&mut self, element: &Element, name: &str) -> (VersionNumber, DeclaredSource) {
        let (declared, source) = effective_declared(
            element.attribute("compatibility"),
            self.root_version.as_ref(),
            &self.env.config.software_version,
        );
        let version = match declared {
            DeclaredVersion::Parsed(version) => version.clone(),
            DeclaredVersion::Raw(text) => match text.parse() {
                Ok(version) => version,
                Err(error) => {
                    let fallback = self.env.config.default_document_version.clone();
                    self.diagnostics.push(
                        DiagnosticKind::InvalidVersion,
                        Some(name),
                        format!("Invalid compatibility level '{text}' of operator '{name}' ({error}); assuming {fallback}"),
                    );
                    fallback
                }
            },
        };
        (version, source)
    }

    fn flag(&mut self, element: &Element, attribute: &str, owner: &str) -> bool {
        match element.attribute(attribute) {
            None | Some("true" | "yes") => true,
            Some("false" | "no") => false,
            Some(other) => {
                self.diagnostics.push(
                    DiagnosticKind::Structure,
                    Some(owner),
                    format!("Invalid value '{other}' of attribute '{attribute}' in '{owner}', using true"),
                );
                true
            }
        }
    }

    fn read_breakpoints(&mut self, element: &Element, operator: &mut Operator) {
        let Some(list) = element.attribute("breakpoints") else {
            return;
        };
        for token in list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.parse::<Breakpoint>() {
                Ok(breakpoint) => operator.add_breakpoint(breakpoint),
                Err(token) => self.diagnostics.push(
                    DiagnosticKind::Structure,
                    Some(&operator.name),
                    format!("Unknown breakpoint '{token}' of operator '{}' ignored", operator.name),
                ),
            }
        }
    }

    fn read_parameters(&mut self, element: &Element, operator: &mut Operator, schema: Option<&OperatorType>) {
        for child in element.children() {
            let value = match child.name() {
                "parameter" => ParameterValue::Single(child.attribute("value").unwrap_or_default().to_string()),
                "list" => ParameterValue::List(
                    child
                        .children_named("parameter")
                        .map(|entry| {
                            (
                                entry.attribute("key").unwrap_or_default().to_string(),
                                entry.attribute("value").unwrap_or_default().to_string(),
                            )
                        })
                        .collect(),
                ),
                "enumeration" => ParameterValue::Enumeration(
                    child
                        .children_named("parameter")
                        .map(|entry| entry.attribute("value").unwrap_or_default().to_string())
                        .collect(),
                ),
                "process" | "operator" => continue,
                tag if FILTER_OWNED_TAGS.contains(&tag) => continue,
                tag => {
                    self.diagnostics.push(
                        DiagnosticKind::Structure,
                        Some(&operator.name),
                        format!("Unknown element <{tag}> in operator '{}' ignored", operator.name),
                    );
                    continue;
                }
            };
            let Some(key) = child.attribute("key") else {
                self.diagnostics.push(
                    DiagnosticKind::Structure,
                    Some(&operator.name),
                    format!("<{}> without key in operator '{}' ignored", child.name(), operator.name),
                );
                continue;
            };
            self.set_parameter(operator, schema, key, value);
        }
    }

    fn set_parameter(&mut self, operator: &mut Operator, schema: Option<&OperatorType>, key: &str, value: ParameterValue) {
        if let Some(ty) = schema {
            match ty.descriptor().parameter(key) {
                None if self.env.config.is_ignored_parameter(key) => return,
                None => self.diagnostics.push(
                    DiagnosticKind::UnknownParameter,
                    Some(&operator.name),
                    format!(
                        "Operator '{}' of type '{}' has no parameter '{key}'; the value is kept",
                        operator.name,
                        ty.key()
                    ),
                ),
                Some(declared) if declared.kind != value.kind() => self.diagnostics.push(
                    DiagnosticKind::Structure,
                    Some(&operator.name),
                    format!(
                        "Parameter '{key}' of operator '{}' should be {:?} but is {:?}",
                        operator.name,
                        declared.kind,
                        value.kind()
                    ),
                ),
                Some(_) => {}
            }
        }
        operator.parameters.set(key, value);
    }

    /// Rules see the version the document declares, not the operator's own
    /// compatibility level, so a migrated and re-exported document is left
    /// alone.
    fn apply_rules(&mut self, operator: &mut Operator, latest: &VersionNumber) {
        let key = operator.export_key().to_string();
        let mut recorded = Vec::new();
        let outcomes = {
            let mut ctx = RuleContext::new(operator, &self.document_version, latest, self.env.operators, &mut recorded);
            self.rules.apply(&key, &mut ctx)
        };

        for outcome in outcomes {
            match outcome {
                RuleOutcome::Changed { message, .. } => {
                    self.diagnostics
                        .push_modification(DiagnosticKind::RuleApplied, Some(&operator.name), message);
                }
                RuleOutcome::Failed { rule, error } => self.diagnostics.push(
                    DiagnosticKind::RuleFailed,
                    Some(&operator.name),
                    format!("Migration rule '{rule}' skipped for operator '{}': {error}", operator.name),
                ),
            }
        }
        self.jobs.extend_recorded(recorded);
    }

    fn read_units(&mut self, element: &Element, operator: &mut Operator) {
        let declared_units = operator.units.len();
        for (index, process) in element.children_named("process").enumerate() {
            if index >= declared_units {
                self.diagnostics.push(
                    DiagnosticKind::Structure,
                    Some(&operator.name),
                    format!(
                        "Operator '{}' has {declared_units} execution unit(s); surplus <process> #{} skipped",
                        operator.name,
                        index + 1
                    ),
                );
                continue;
            }
            self.build_unit(process, &mut operator.units[index]);
        }

        let legacy: Vec<&Element> = element.children_named("operator").collect();
        if !legacy.is_empty() {
            self.read_legacy_children(&legacy, operator);
        }
    }

    /// Distribute directly nested operators of the pre-5.0 layout into units
    fn read_legacy_children(&mut self, children: &[&Element], operator: &mut Operator) {
        if !self.env.config.accept_legacy_layout || operator.units.is_empty() {
            let reason = if operator.units.is_empty() {
                "it has no execution units"
            } else {
                "the legacy layout is disabled"
            };
            self.diagnostics.push(
                DiagnosticKind::Structure,
                Some(&operator.name),
                format!(
                    "{} operator(s) nested directly in '{}' skipped: {reason}",
                    children.len(),
                    operator.name
                ),
            );
            return;
        }

        if !self.legacy_flagged {
            self.legacy_flagged = true;
            self.diagnostics.push_modification(
                DiagnosticKind::LegacyLayout,
                None,
                format!(
                    "Document uses the layout from before version {PROCESS_LAYOUT_VERSION} with operators nested \
                     directly in operators; missing connections are restored by automatic data-flow construction"
                ),
            );
        }

        let last = operator.units.len() - 1;
        let mut filled = vec![false; operator.units.len()];
        for (index, child) in children.iter().enumerate() {
            let unit = index.min(last);
            let built = self.build_operator(child);
            self.add_to_unit(&mut operator.units[unit], built);
            filled[unit] = true;
        }
        for (unit, _) in filled.iter().enumerate().filter(|(_, filled)| **filled) {
            self.jobs.push_legacy(operator.id, unit);
        }
    }

    fn build_unit(&mut self, element: &Element, unit: &mut ExecutionUnit) {
        let expanded = self.flag(element, "expanded", unit.name());
        unit.set_expanded(expanded);

        for child in element.children() {
            match child.name() {
                "operator" => {
                    let built = self.build_operator(child);
                    self.add_to_unit(unit, built);
                }
                "connect" => {}
                tag if FILTER_OWNED_TAGS.contains(&tag) => {}
                tag => self.diagnostics.push(
                    DiagnosticKind::Structure,
                    None,
                    format!("Unknown element <{tag}> in execution unit '{}' ignored", unit.name()),
                ),
            }
        }

        for connect in element.children_named("connect") {
            self.connect(unit, connect);
        }
        for filter in self.env.filters {
            filter.unit_imported(element, unit);
        }
    }

    fn add_to_unit(&mut self, unit: &mut ExecutionUnit, operator: Operator) {
        let (index, renamed) = unit.add_operator(operator);
        if let Some(original) = renamed {
            let unique = unit.operators()[index].name.clone();
            self.diagnostics.push(
                DiagnosticKind::DuplicateName,
                Some(&unique),
                format!(
                    "Operator name '{original}' is already used in '{}'; renamed to '{unique}'",
                    unit.name()
                ),
            );
        }
    }

    /// Restore one `connect` element; any failure drops it with exactly one diagnostic
    fn connect(&mut self, unit: &mut ExecutionUnit, element: &Element) {
        if let Err(reason) = Self::try_connect(unit, element) {
            let describe = |op: &str, port: &str| {
                let op = element.attribute(op).unwrap_or("");
                format!("{op}.{}", element.attribute(port).unwrap_or("?"))
            };
            self.diagnostics.push(
                DiagnosticKind::Connection,
                None,
                format!(
                    "Connection {} -> {} in '{}' dropped: {reason}",
                    describe("from_op", "from_port"),
                    describe("to_op", "to_port"),
                    unit.name()
                ),
            );
        }
    }

    fn try_connect(unit: &mut ExecutionUnit, element: &Element) -> Result<(), String> {
        let (Some(from_port), Some(to_port)) = (element.attribute("from_port"), element.attribute("to_port")) else {
            return Err("port name missing".to_string());
        };
        let node = |attribute: &str| match element.attribute(attribute) {
            None => Ok(NodeRef::Boundary),
            Some(name) => unit
                .position_of_name(name)
                .map(NodeRef::Operator)
                .ok_or_else(|| format!("no operator named '{name}'")),
        };
        let from_node = node("from_op")?;
        let to_node = node("to_op")?;

        let from_lookup = unit.source_ports(from_node).map(|p| p.lookup(from_port));
        if matches!(from_lookup, None | Some(PortLookup::Missing)) {
            return Err(format!("no output port '{from_port}'"));
        }
        let to_lookup = unit.sink_ports(to_node).map(|p| p.lookup(to_port));
        if matches!(to_lookup, None | Some(PortLookup::Missing)) {
            return Err(format!("no input port '{to_port}'"));
        }

        let from = unit
            .source_ports_mut(from_node)
            .ok_or_else(|| "no such operator".to_string())?
            .get_or_grow(from_port)
            .map_err(|e| e.to_string())?;
        let to = unit
            .sink_ports_mut(to_node)
            .ok_or_else(|| "no such operator".to_string())?
            .get_or_grow(to_port)
            .map_err(|e| e.to_string())?;

        unit.connect(
            Endpoint {
                node: from_node,
                port: from,
            },
            Endpoint { node: to_node, port: to },
        )
        .map_err(|e| e.to_string())
    }
}
