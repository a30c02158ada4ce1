//! Rule registry and engine
//!
//! [`RuleRegistry`] keeps, per operator type key, the ordered list of rules
//! that apply to it. General rules bound to several keys are appended to
//! each of those lists at the point they are registered; universal rules
//! (`"*"`) run after every type-specific list. [`RuleEngine`] applies the
//! list to one operator.

use crate::declarative::{DeclarativeRule, RuleDefinitionDocument, RuleTarget, ANY_OPERATOR};
use crate::error::{RuleDefinitionError, RuleError};
use crate::rule::{MigrationRule, RuleContext};
use once_cell::sync::Lazy;
use procflow_model::VersionNumber;
use procflow_registry::Shared;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Ordered migration rules per type key
#[derive(Clone, Default)]
pub struct RuleRegistry {
    by_key: HashMap<String, Vec<Arc<dyn MigrationRule>>>,
    universal: Vec<Arc<dyn MigrationRule>>,
}

impl RuleRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule for one type
    pub fn register(&mut self, key: impl Into<String>, rule: impl MigrationRule + 'static) {
        self.register_shared(key.into(), Arc::new(rule));
    }

    fn register_shared(&mut self, key: String, rule: Arc<dyn MigrationRule>) {
        if key == ANY_OPERATOR {
            self.universal.push(rule);
        } else {
            self.by_key.entry(key).or_default().push(rule);
        }
    }

    /// Append one rule for several types
    ///
    /// `"*"` among the keys makes the rule universal.
    pub fn register_general<I, S>(&mut self, keys: I, rule: impl MigrationRule + 'static)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rule: Arc<dyn MigrationRule> = Arc::new(rule);
        for key in keys {
            self.register_shared(key.into(), Arc::clone(&rule));
        }
    }

    /// Register every entry of a rule document
    ///
    /// Nothing is registered if any entry is invalid.
    ///
    /// # Errors
    /// Returns error on the first entry without a valid target.
    pub fn load_document(&mut self, document: RuleDefinitionDocument) -> Result<usize, RuleDefinitionError> {
        let rules: Vec<(RuleTarget, DeclarativeRule)> = document
            .rules
            .into_iter()
            .enumerate()
            .map(|(index, definition)| definition.into_rule(index))
            .collect::<Result<_, _>>()?;

        let count = rules.len();
        for (target, rule) in rules {
            match target {
                RuleTarget::Operator(key) => self.register(key, rule),
                RuleTarget::General(keys) => self.register_general(keys, rule),
            }
        }
        Ok(count)
    }

    /// Parse and register a rule document
    ///
    /// # Errors
    /// Returns error if the text is invalid.
    pub fn load_yaml(&mut self, text: &str) -> Result<usize, RuleDefinitionError> {
        self.load_document(RuleDefinitionDocument::from_yaml(text)?)
    }

    /// Read and register a rule file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is invalid.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, RuleDefinitionError> {
        self.load_document(RuleDefinitionDocument::from_path(path)?)
    }

    /// Rules for `key` in application order
    pub fn rules_for<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a Arc<dyn MigrationRule>> + 'a {
        self.by_key
            .get(key)
            .into_iter()
            .flatten()
            .chain(self.universal.iter())
    }

    /// Total number of registrations
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.values().map(Vec::len).sum::<usize>() + self.universal.len()
    }

    /// Check if no rule is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("keys", &self.by_key.len())
            .field("universal", &self.universal.len())
            .finish()
    }
}

/// Result of one rule that did something
#[derive(Debug)]
pub enum RuleOutcome {
    /// Rule changed the operator
    Changed { rule: String, message: String },
    /// Rule failed and was skipped
    Failed { rule: String, error: RuleError },
}

/// Applies registered rules to operators
#[derive(Debug, Clone, Copy)]
pub struct RuleEngine<'r> {
    rules: &'r RuleRegistry,
}

impl<'r> RuleEngine<'r> {
    #[inline]
    #[must_use]
    pub fn new(rules: &'r RuleRegistry) -> Self {
        Self { rules }
    }

    /// Whether a rule bounded by `applies_before` may run for an operator
    /// in a document declared at `declared` whose type is at `latest`
    #[must_use]
    pub fn is_applicable(applies_before: Option<&VersionNumber>, declared: &VersionNumber, latest: &VersionNumber) -> bool {
        declared.is_before(latest) && applies_before.map_or(true, |bound| declared.is_before(bound))
    }

    /// Apply every rule bound to `key` in order
    ///
    /// Failing rules are skipped; later rules still run.
    pub fn apply(&self, key: &str, ctx: &mut RuleContext<'_>) -> Vec<RuleOutcome> {
        if !ctx.declared().is_before(ctx.latest()) {
            return Vec::new();
        }

        let mut outcomes = Vec::new();
        for rule in self.rules.rules_for(key) {
            if !Self::is_applicable(rule.applies_before(), ctx.declared(), ctx.latest()) {
                continue;
            }
            match rule.apply(ctx) {
                Ok(None) => {}
                Ok(Some(message)) => {
                    debug!(rule = rule.name(), operator = %ctx.operator().name, "migration rule applied");
                    outcomes.push(RuleOutcome::Changed {
                        rule: rule.name().to_string(),
                        message,
                    });
                }
                Err(error) => {
                    warn!(rule = rule.name(), operator = %ctx.operator().name, %error, "migration rule skipped");
                    outcomes.push(RuleOutcome::Failed {
                        rule: rule.name().to_string(),
                        error,
                    });
                }
            }
        }
        outcomes
    }
}

static GLOBAL: Lazy<Shared<RuleRegistry>> = Lazy::new(|| Shared::new(RuleRegistry::new()));

/// Process-wide rule registry
#[must_use]
pub fn global() -> &'static Shared<RuleRegistry> {
    &GLOBAL
}
