//! Diagnostics collector
//!
//! Import problems that do not abort the import are collected here, in the
//! order they were found, together with a flag telling whether migration
//! changed the document.

use std::fmt::{self, Display, Formatter};
use tracing::debug;

/// Category of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Document carries no version attribute
    MissingVersion,
    /// Version text could not be parsed
    InvalidVersion,
    /// Operator keeps older semantics than its type's latest version
    BehaviorChanged,
    /// Operator type is not registered, a placeholder was used
    UnknownOperator,
    /// Deprecated operator type was replaced
    ReplacedOperator,
    /// Parameter not declared by the operator type
    UnknownParameter,
    /// Operator name collided with a sibling and was changed
    DuplicateName,
    /// Connection could not be restored
    Connection,
    /// Pre-5.0 nesting layout
    LegacyLayout,
    /// Unknown tag, attribute value or surplus child
    Structure,
    /// Migration rule changed the operator
    RuleApplied,
    /// Migration rule failed and was skipped
    RuleFailed,
    /// Post-construction job could not run
    JobFailed,
}

/// One collected diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// Name of the operator the diagnostic refers to
    pub operator: Option<String>,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Ordered diagnostics of one import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    modified: bool,
}

impl Diagnostics {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic
    pub fn push(&mut self, kind: DiagnosticKind, operator: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        debug!(?kind, operator, %message, "import diagnostic");
        self.entries.push(Diagnostic {
            kind,
            message,
            operator: operator.map(str::to_string),
        });
    }

    /// Record a diagnostic and mark the document as modified
    pub fn push_modification(&mut self, kind: DiagnosticKind, operator: Option<&str>, message: impl Into<String>) {
        self.modified = true;
        self.push(kind, operator, message);
    }

    /// Whether migration changed the document
    #[inline]
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Diagnostics of one kind
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    /// Messages in order
    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|d| d.message.as_str()).collect()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modification_sets_flag() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(DiagnosticKind::UnknownParameter, Some("A"), "unknown parameter 'x'");
        assert!(!diagnostics.is_modified());
        diagnostics.push_modification(DiagnosticKind::RuleApplied, Some("A"), "renamed");
        assert!(diagnostics.is_modified());
        assert_eq!(diagnostics.messages(), vec!["unknown parameter 'x'", "renamed"]);
        assert_eq!(diagnostics.of_kind(DiagnosticKind::RuleApplied).count(), 1);
    }
}
