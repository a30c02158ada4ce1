//! Declarative rules loaded from YAML rule documents
//!
//! # Example
//!
//! ```yaml
//! rules:
//!   - operator: read_csv
//!     applies_before: "6.0.0"
//!     action: rename_parameter
//!     from: filename
//!     to: csv_file
//!   - applies_to: ["*"]
//!     action: change_parameter_value
//!     key: random_seed
//!     from: "-1"
//!     to: "1992"
//!     when:
//!       parameter_set: { key: use_local_random_seed }
//! ```

use crate::condition::Condition;
use crate::error::{RuleDefinitionError, RuleError};
use crate::rule::{DeferredJob, MigrationRule, RuleContext};
use procflow_model::{Operator, ParameterKind, ParameterValue, VersionNumber};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What a declarative rule does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RuleAction {
    /// Rename parameter `from` to `to`, keeping its position
    RenameParameter { from: String, to: String },
    /// Set single parameter `key` to `to`, only if it currently equals `from` when given
    ChangeParameterValue {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        to: String,
    },
    /// Re-create the operator as type `with`, keeping name, flags and parameters
    ReplaceOperator { with: String },
    /// Delete the operator and move its inner operators into the parent unit
    UnwrapOperator,
    /// Swap two execution units
    ExchangeSubprocesses { first: usize, second: usize },
    /// Connect unconnected ports of one unit, or of all units
    WireAutomatically {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<usize>,
    },
    /// Swap key and value of every entry of list parameter `key`
    SwitchListEntries { key: String },
}

impl RuleAction {
    fn default_name(&self) -> String {
        match self {
            Self::RenameParameter { from, to } => format!("rename_parameter({from} -> {to})"),
            Self::ChangeParameterValue { key, .. } => format!("change_parameter_value({key})"),
            Self::ReplaceOperator { with } => format!("replace_operator({with})"),
            Self::UnwrapOperator => "unwrap_operator".to_string(),
            Self::ExchangeSubprocesses { first, second } => format!("exchange_subprocesses({first}, {second})"),
            Self::WireAutomatically { .. } => "wire_automatically".to_string(),
            Self::SwitchListEntries { key } => format!("switch_list_entries({key})"),
        }
    }

    fn apply(&self, ctx: &mut RuleContext<'_>) -> Result<Option<String>, RuleError> {
        match self {
            Self::RenameParameter { from, to } => {
                if from == to {
                    return Ok(None);
                }
                if !ctx.operator().parameters.contains(from) {
                    return Err(RuleError::MissingParameter(from.clone()));
                }
                ctx.operator_mut().parameters.rename(from, to);
                Ok(Some(format!(
                    "Renamed parameter '{from}' to '{to}' of operator '{}'",
                    ctx.operator().name
                )))
            }
            Self::ChangeParameterValue { key, from, to } => change_value(ctx, key, from.as_deref(), to),
            Self::ReplaceOperator { with } => replace(ctx, with),
            Self::UnwrapOperator => {
                let operator = ctx.operator().id;
                ctx.defer(DeferredJob::Unwrap { operator });
                Ok(Some(format!(
                    "Removed obsolete wrapper operator '{}', its inner operators were moved to the parent",
                    ctx.operator().name
                )))
            }
            Self::ExchangeSubprocesses { first, second } => {
                check_unit(ctx.operator(), *first)?;
                check_unit(ctx.operator(), *second)?;
                if first == second {
                    return Ok(None);
                }
                let operator = ctx.operator().id;
                ctx.defer(DeferredJob::ExchangeUnits {
                    operator,
                    first: *first,
                    second: *second,
                });
                Ok(Some(format!(
                    "Exchanged execution units {first} and {second} of operator '{}'",
                    ctx.operator().name
                )))
            }
            Self::WireAutomatically { unit } => {
                if let Some(index) = unit {
                    check_unit(ctx.operator(), *index)?;
                }
                let operator = ctx.operator().id;
                ctx.defer(DeferredJob::AutoWire { operator, unit: *unit });
                Ok(Some(format!(
                    "Data flow inside operator '{}' was constructed automatically",
                    ctx.operator().name
                )))
            }
            Self::SwitchListEntries { key } => switch_entries(ctx, key),
        }
    }
}

fn check_unit(operator: &Operator, index: usize) -> Result<(), RuleError> {
    if index < operator.units.len() {
        Ok(())
    } else {
        Err(RuleError::NoSuchUnit {
            index,
            count: operator.units.len(),
        })
    }
}

fn change_value(ctx: &mut RuleContext<'_>, key: &str, from: Option<&str>, to: &str) -> Result<Option<String>, RuleError> {
    let current = match ctx.operator().parameters.get(key) {
        None => None,
        Some(ParameterValue::Single(value)) => Some(value.as_str()),
        Some(other) => {
            return Err(RuleError::WrongKind {
                key: key.to_string(),
                expected: ParameterKind::Single,
                actual: other.kind(),
            })
        }
    };
    let matches = match from {
        Some(expected) => current == Some(expected),
        None => current != Some(to),
    };
    if !matches || current == Some(to) {
        return Ok(None);
    }
    let old = current.unwrap_or("<unset>").to_string();
    ctx.operator_mut().parameters.set(key, to);
    Ok(Some(format!(
        "Changed parameter '{key}' of operator '{}' from '{old}' to '{to}'",
        ctx.operator().name
    )))
}

fn replace(ctx: &mut RuleContext<'_>, with: &str) -> Result<Option<String>, RuleError> {
    if ctx.operator().type_key == with {
        return Ok(None);
    }
    let replacement_type = ctx.registry().require(with)?;
    let declared = ctx.declared().clone();
    let history = replacement_type.descriptor().history();

    let old = ctx.operator();
    let old_key = old.export_key().to_string();
    let mut replacement = replacement_type.instantiate(old.id, &old.name);
    replacement.compatibility = history.resolve(&declared).working;
    replacement.enabled = old.enabled;
    replacement.expanded = old.expanded;
    replacement.breakpoints = old.breakpoints.clone();
    replacement.parameters = old.parameters.clone();
    replacement.auxiliary = old.auxiliary.clone();

    let name = replacement.name.clone();
    *ctx.operator_mut() = replacement;
    Ok(Some(format!("Replaced operator '{name}' of type '{old_key}' by type '{with}'")))
}

fn switch_entries(ctx: &mut RuleContext<'_>, key: &str) -> Result<Option<String>, RuleError> {
    let name = ctx.operator().name.clone();
    match ctx.operator_mut().parameters.get_mut(key) {
        None => Err(RuleError::MissingParameter(key.to_string())),
        Some(ParameterValue::List(entries)) => {
            if entries.iter().all(|(k, v)| k == v) {
                return Ok(None);
            }
            for (k, v) in entries.iter_mut() {
                std::mem::swap(k, v);
            }
            Ok(Some(format!("Switched keys and values of list '{key}' of operator '{name}'")))
        }
        Some(other) => Err(RuleError::WrongKind {
            key: key.to_string(),
            expected: ParameterKind::List,
            actual: other.kind(),
        }),
    }
}

/// Rule built from a [`RuleDefinition`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarativeRule {
    name: String,
    applies_before: Option<VersionNumber>,
    when: Option<Condition>,
    action: RuleAction,
}

impl DeclarativeRule {
    /// Unconditional rule named after its action
    #[must_use]
    pub fn new(action: RuleAction) -> Self {
        Self {
            name: action.default_name(),
            applies_before: None,
            when: None,
            action,
        }
    }

    /// Set diagnostic name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Restrict to operators declared older than `version`
    #[inline]
    #[must_use]
    pub fn with_applies_before(mut self, version: VersionNumber) -> Self {
        self.applies_before = Some(version);
        self
    }

    /// Guard with a condition
    #[inline]
    #[must_use]
    pub fn when(mut self, condition: Condition) -> Self {
        self.when = Some(condition);
        self
    }

    #[inline]
    #[must_use]
    pub fn action(&self) -> &RuleAction {
        &self.action
    }
}

impl MigrationRule for DeclarativeRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn applies_before(&self) -> Option<&VersionNumber> {
        self.applies_before.as_ref()
    }

    fn apply(&self, ctx: &mut RuleContext<'_>) -> Result<Option<String>, RuleError> {
        if let Some(condition) = &self.when {
            if !condition.holds(ctx.operator()) {
                return Ok(None);
            }
        }
        self.action.apply(ctx)
    }
}

/// Operator types a definition is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTarget {
    /// One type
    Operator(String),
    /// Several types, or every type with `"*"`
    General(Vec<String>),
}

/// Key marking a rule that applies to every operator type
pub const ANY_OPERATOR: &str = "*";

/// One entry of a rule document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applies_to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_before: Option<VersionNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,
    #[serde(flatten)]
    pub action: RuleAction,
}

impl RuleDefinition {
    /// Split into binding target and rule
    ///
    /// # Errors
    /// Returns error unless exactly one of `operator` and `applies_to` is given.
    pub fn into_rule(self, index: usize) -> Result<(RuleTarget, DeclarativeRule), RuleDefinitionError> {
        let target = match (self.operator, self.applies_to.is_empty()) {
            (Some(key), true) => RuleTarget::Operator(key),
            (None, false) => RuleTarget::General(self.applies_to),
            (None, true) => return Err(RuleDefinitionError::MissingTarget { index }),
            (Some(_), false) => return Err(RuleDefinitionError::ConflictingTarget { index }),
        };
        let mut rule = DeclarativeRule::new(self.action);
        if let Some(name) = self.name {
            rule = rule.with_name(name);
        }
        rule.applies_before = self.applies_before;
        rule.when = self.when;
        Ok((target, rule))
    }
}

/// YAML rule document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinitionDocument {
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl RuleDefinitionDocument {
    /// Parse rule YAML
    ///
    /// # Errors
    /// Returns error if the text is not a valid rule document.
    pub fn from_yaml(text: &str) -> Result<Self, RuleDefinitionError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read and parse a rule file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, RuleDefinitionError> {
        let text = std::fs::read_to_string(path).map_err(|source| RuleDefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use procflow_model::{OperatorId, PortDirection, Ports};
    use procflow_registry::{OperatorDescriptor, OperatorRegistry};

    fn operator() -> Operator {
        let mut op = Operator::new(
            OperatorId::new(7),
            "Reader",
            "read_csv",
            Ports::empty(PortDirection::Input),
            Ports::empty(PortDirection::Output),
        );
        op.parameters.set("filename", "data.csv");
        op.parameters.set("separator", ";");
        op.parameters.set(
            "mapping",
            ParameterValue::List(vec![("new".into(), "old".into()), ("b".into(), "a".into())]),
        );
        op
    }

    fn run(action: RuleAction, op: &mut Operator) -> (Result<Option<String>, RuleError>, Vec<DeferredJob>) {
        let mut registry = OperatorRegistry::new();
        registry
            .register(OperatorDescriptor::new("read_csv_v2", VersionNumber::new(9, 0, 0)))
            .unwrap();
        let declared = VersionNumber::new(5, 0, 0);
        let latest = VersionNumber::new(9, 0, 0);
        let mut jobs = Vec::new();
        let result = {
            let mut ctx = RuleContext::new(op, &declared, &latest, &registry, &mut jobs);
            DeclarativeRule::new(action).apply(&mut ctx)
        };
        (result, jobs)
    }

    #[test]
    fn rename_keeps_position() {
        let mut op = operator();
        let action = RuleAction::RenameParameter {
            from: "filename".into(),
            to: "csv_file".into(),
        };
        assert!(run(action.clone(), &mut op).0.unwrap().is_some());
        assert_eq!(op.parameters.keys().collect::<Vec<_>>(), vec!["csv_file", "separator", "mapping"]);

        // source is gone now
        let result = run(action, &mut op).0;
        assert!(matches!(result, Err(RuleError::MissingParameter(key)) if key == "filename"));
        assert_eq!(op.parameters.get_single("csv_file"), Some("data.csv"));
    }

    #[test]
    fn rename_to_same_key_is_a_no_op() {
        let mut op = operator();
        let action = RuleAction::RenameParameter {
            from: "separator".into(),
            to: "separator".into(),
        };
        assert_eq!(run(action, &mut op).0.unwrap(), None);
    }

    #[test]
    fn change_value_with_and_without_from() {
        let mut op = operator();
        let guarded = RuleAction::ChangeParameterValue {
            key: "separator".into(),
            from: Some(",".into()),
            to: "|".into(),
        };
        assert_eq!(run(guarded, &mut op).0.unwrap(), None);

        let unguarded = RuleAction::ChangeParameterValue {
            key: "separator".into(),
            from: None,
            to: ",".into(),
        };
        assert!(run(unguarded.clone(), &mut op).0.unwrap().is_some());
        assert_eq!(op.parameters.get_single("separator"), Some(","));
        assert_eq!(run(unguarded, &mut op).0.unwrap(), None);
    }

    #[test]
    fn change_value_on_list_fails() {
        let mut op = operator();
        let action = RuleAction::ChangeParameterValue {
            key: "mapping".into(),
            from: None,
            to: "x".into(),
        };
        assert!(matches!(run(action, &mut op).0, Err(RuleError::WrongKind { .. })));
    }

    #[test]
    fn replace_keeps_identity() {
        let mut op = operator();
        op.enabled = false;
        let (result, _) = run(
            RuleAction::ReplaceOperator {
                with: "read_csv_v2".into(),
            },
            &mut op,
        );
        assert!(result.unwrap().unwrap().contains("read_csv_v2"));
        assert_eq!(op.type_key, "read_csv_v2");
        assert_eq!(op.id, OperatorId::new(7));
        assert_eq!(op.name, "Reader");
        assert!(!op.enabled);
        assert_eq!(op.parameters.get_single("filename"), Some("data.csv"));
    }

    #[test]
    fn replace_with_unknown_type_fails() {
        let mut op = operator();
        let (result, _) = run(RuleAction::ReplaceOperator { with: "nope".into() }, &mut op);
        assert!(matches!(result, Err(RuleError::Registry(_))));
        assert_eq!(op.type_key, "read_csv");
    }

    #[test]
    fn structural_actions_defer_jobs() {
        let mut op = operator();
        let (result, jobs) = run(RuleAction::UnwrapOperator, &mut op);
        assert!(result.unwrap().is_some());
        assert_eq!(jobs, vec![DeferredJob::Unwrap { operator: OperatorId::new(7) }]);

        let (result, jobs) = run(RuleAction::WireAutomatically { unit: Some(0) }, &mut op);
        assert!(matches!(result, Err(RuleError::NoSuchUnit { index: 0, count: 0 })));
        assert!(jobs.is_empty());
    }

    #[test]
    fn switch_list_entries() {
        let mut op = operator();
        let (result, _) = run(RuleAction::SwitchListEntries { key: "mapping".into() }, &mut op);
        assert!(result.unwrap().is_some());
        assert_eq!(
            op.parameters.get("mapping"),
            Some(&ParameterValue::List(vec![("old".into(), "new".into()), ("a".into(), "b".into())]))
        );

        let (result, _) = run(RuleAction::SwitchListEntries { key: "absent".into() }, &mut op);
        assert!(matches!(result, Err(RuleError::MissingParameter(_))));
    }

    #[test]
    fn condition_guards_action() {
        let mut op = operator();
        let rule = DeclarativeRule::new(RuleAction::ChangeParameterValue {
            key: "separator".into(),
            from: None,
            to: "\t".into(),
        })
        .when(Condition::ParameterEquals {
            key: "separator".into(),
            value: ",".into(),
        });

        let registry = OperatorRegistry::new();
        let declared = VersionNumber::new(5, 0, 0);
        let latest = VersionNumber::new(9, 0, 0);
        let mut jobs = Vec::new();
        let mut ctx = RuleContext::new(&mut op, &declared, &latest, &registry, &mut jobs);
        assert_eq!(rule.apply(&mut ctx).unwrap(), None);
        assert_eq!(op.parameters.get_single("separator"), Some(";"));
    }

    #[test]
    fn definition_targets() {
        let yaml = r#"
rules:
  - operator: read_csv
    applies_before: "6.0.0"
    action: rename_parameter
    from: filename
    to: csv_file
  - name: seed
    applies_to: ["*"]
    action: change_parameter_value
    key: random_seed
    to: "1992"
  - action: unwrap_operator
"#;
        let document = RuleDefinitionDocument::from_yaml(yaml).unwrap();
        assert_eq!(document.rules.len(), 3);

        let mut rules = document.rules.into_iter().enumerate();
        let (i, first) = rules.next().unwrap();
        let (target, rule) = first.into_rule(i).unwrap();
        assert_eq!(target, RuleTarget::Operator("read_csv".into()));
        assert_eq!(rule.applies_before(), Some(&VersionNumber::new(6, 0, 0)));

        let (i, second) = rules.next().unwrap();
        let (target, rule) = second.into_rule(i).unwrap();
        assert_eq!(target, RuleTarget::General(vec![ANY_OPERATOR.into()]));
        assert_eq!(rule.name(), "seed");

        let (i, third) = rules.next().unwrap();
        assert!(matches!(third.into_rule(i), Err(RuleDefinitionError::MissingTarget { index: 2 })));
    }
}
