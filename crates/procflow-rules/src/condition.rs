//! Guards for declarative rules

use procflow_model::Operator;
use serde::{Deserialize, Serialize};

/// Predicate over an operator's parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Single parameter `key` is set to `value`
    ParameterEquals { key: String, value: String },
    /// Parameter `key` is not set to `value` (unset counts as unequal)
    ParameterUnequals { key: String, value: String },
    /// Parameter `key` is set
    ParameterSet { key: String },
    /// Every nested condition holds
    All(Vec<Condition>),
    /// At least one nested condition holds
    Any(Vec<Condition>),
    /// Nested condition does not hold
    Not(Box<Condition>),
}

impl Condition {
    /// Evaluate against `operator`
    #[must_use]
    pub fn holds(&self, operator: &Operator) -> bool {
        match self {
            Self::ParameterEquals { key, value } => operator.parameters.get_single(key) == Some(value.as_str()),
            Self::ParameterUnequals { key, value } => operator.parameters.get_single(key) != Some(value.as_str()),
            Self::ParameterSet { key } => operator.parameters.contains(key),
            Self::All(conditions) => conditions.iter().all(|c| c.holds(operator)),
            Self::Any(conditions) => conditions.iter().any(|c| c.holds(operator)),
            Self::Not(condition) => !condition.holds(operator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procflow_model::{OperatorId, PortDirection, Ports};

    fn operator(params: &[(&str, &str)]) -> Operator {
        let mut op = Operator::new(
            OperatorId::new(1),
            "Op",
            "op",
            Ports::empty(PortDirection::Input),
            Ports::empty(PortDirection::Output),
        );
        for (k, v) in params {
            op.parameters.set(*k, *v);
        }
        op
    }

    #[test]
    fn parameter_predicates() {
        let op = operator(&[("mode", "fast")]);
        assert!(Condition::ParameterEquals { key: "mode".into(), value: "fast".into() }.holds(&op));
        assert!(Condition::ParameterUnequals { key: "mode".into(), value: "slow".into() }.holds(&op));
        assert!(Condition::ParameterUnequals { key: "other".into(), value: "x".into() }.holds(&op));
        assert!(!Condition::ParameterSet { key: "other".into() }.holds(&op));
    }

    #[test]
    fn combinators() {
        let op = operator(&[("a", "1"), ("b", "2")]);
        let yaml = r#"
all:
  - parameter_set: { key: a }
  - not:
      parameter_equals: { key: b, value: "3" }
  - any:
      - parameter_set: { key: missing }
      - parameter_equals: { key: a, value: "1" }
"#;
        let condition: Condition = serde_yaml::from_str(yaml).unwrap();
        assert!(condition.holds(&op));
        assert!(!Condition::Any(Vec::new()).holds(&op));
        assert!(Condition::All(Vec::new()).holds(&op));
    }
}
