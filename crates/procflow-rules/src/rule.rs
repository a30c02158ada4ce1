//! Migration rule trait and execution context
//!
//! A [`MigrationRule`] inspects one freshly built operator and rewrites it in
//! place. Rules that need to touch the surrounding graph (removing a wrapper,
//! swapping units, rewiring) record a [`DeferredJob`] instead; the importer
//! runs those once the whole tree exists.

use crate::error::RuleError;
use procflow_model::{Operator, OperatorId, VersionNumber};
use procflow_registry::OperatorRegistry;

/// Post-construction job recorded by a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredJob {
    /// Move the operator's inner operators into its parent unit and delete it
    Unwrap { operator: OperatorId },
    /// Swap two execution units of the operator
    ExchangeUnits {
        operator: OperatorId,
        first: usize,
        second: usize,
    },
    /// Connect unconnected ports automatically
    ///
    /// `unit: None` wires every unit of the operator.
    AutoWire {
        operator: OperatorId,
        unit: Option<usize>,
    },
}

impl DeferredJob {
    /// Operator the job targets
    #[inline]
    #[must_use]
    pub fn operator(&self) -> OperatorId {
        match self {
            Self::Unwrap { operator } | Self::ExchangeUnits { operator, .. } | Self::AutoWire { operator, .. } => {
                *operator
            }
        }
    }
}

/// State handed to a rule
pub struct RuleContext<'a> {
    operator: &'a mut Operator,
    declared: &'a VersionNumber,
    latest: &'a VersionNumber,
    registry: &'a OperatorRegistry,
    jobs: &'a mut Vec<DeferredJob>,
}

impl<'a> RuleContext<'a> {
    /// Create context
    ///
    /// `declared` is the version the enclosing document declares, `latest`
    /// the latest version of the operator's type.
    #[must_use]
    pub fn new(
        operator: &'a mut Operator,
        declared: &'a VersionNumber,
        latest: &'a VersionNumber,
        registry: &'a OperatorRegistry,
        jobs: &'a mut Vec<DeferredJob>,
    ) -> Self {
        Self {
            operator,
            declared,
            latest,
            registry,
            jobs,
        }
    }

    #[inline]
    #[must_use]
    pub fn operator(&self) -> &Operator {
        self.operator
    }

    #[inline]
    pub fn operator_mut(&mut self) -> &mut Operator {
        self.operator
    }

    /// Version the enclosing document declares
    #[inline]
    #[must_use]
    pub fn declared(&self) -> &VersionNumber {
        self.declared
    }

    /// Latest version of the operator's type
    #[inline]
    #[must_use]
    pub fn latest(&self) -> &VersionNumber {
        self.latest
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &OperatorRegistry {
        self.registry
    }

    /// Queue a post-construction job
    #[inline]
    pub fn defer(&mut self, job: DeferredJob) {
        self.jobs.push(job);
    }
}

/// One migration rule
///
/// Implementations must be deterministic: applying a rule to an operator it
/// already migrated must report no change.
pub trait MigrationRule: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Rule only applies to documents declared older than this version
    fn applies_before(&self) -> Option<&VersionNumber> {
        None
    }

    /// Rewrite the operator
    ///
    /// Returns a message describing the change, or `None` if nothing changed.
    ///
    /// # Errors
    /// Returns error if the rule cannot be applied; the rule is then skipped.
    fn apply(&self, ctx: &mut RuleContext<'_>) -> Result<Option<String>, RuleError>;
}
