//! Behavioral compatibility resolution
//!
//! An operator type records the versions at which its runtime behavior changed
//! incompatibly. [`CompatibilityHistory::resolve`] maps the version a document
//! declares for an operator onto the behavior the operator must keep.

use crate::version::VersionNumber;
use serde::{Deserialize, Serialize};

/// Incompatible-change history of an operator type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityHistory {
    latest: VersionNumber,
    incompatible: Vec<VersionNumber>,
}

/// Outcome of resolving an operator's working version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Version whose semantics the operator runs with
    pub working: VersionNumber,
    /// The type's latest version
    pub latest: VersionNumber,
}

impl Resolution {
    /// Whether the operator is held at older semantics
    #[inline]
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.working != self.latest
    }
}

impl CompatibilityHistory {
    /// Create history; the change list is sorted ascending and de-duplicated
    #[must_use]
    pub fn new(latest: VersionNumber, mut incompatible: Vec<VersionNumber>) -> Self {
        incompatible.sort();
        incompatible.dedup();
        Self {
            latest,
            incompatible,
        }
    }

    /// History of a type whose behavior never changed
    #[inline]
    #[must_use]
    pub fn stable(latest: VersionNumber) -> Self {
        Self::new(latest, Vec::new())
    }

    /// Latest version of the type
    #[inline]
    #[must_use]
    pub fn latest(&self) -> &VersionNumber {
        &self.latest
    }

    /// Ascending incompatible-change versions
    #[inline]
    #[must_use]
    pub fn incompatible_changes(&self) -> &[VersionNumber] {
        &self.incompatible
    }

    /// Resolve the working version for a declared version
    ///
    /// Scans the change list from its end for the greatest `v` with
    /// `declared <= v`. When one exists the operator is pinned to `v`,
    /// otherwise it runs with the latest version.
    #[must_use]
    pub fn resolve(&self, declared: &VersionNumber) -> Resolution {
        let working = self
            .incompatible
            .iter()
            .rev()
            .find(|change| declared.is_at_most(change))
            .cloned()
            .unwrap_or_else(|| self.latest.clone());

        Resolution {
            working,
            latest: self.latest.clone(),
        }
    }
}

/// Where an operator's effective declared version came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredSource {
    /// The operator's own `compatibility` attribute
    Operator,
    /// The enclosing document's root version
    Document,
    /// The running software version
    Software,
}

/// Pick the effective declared version string
///
/// Operator attribute first, then the document root version, then the
/// running software version.
#[must_use]
pub fn effective_declared<'a>(
    operator_attr: Option<&'a str>,
    root_version: Option<&'a VersionNumber>,
    software: &'a VersionNumber,
) -> (DeclaredVersion<'a>, DeclaredSource) {
    match (operator_attr, root_version) {
        (Some(raw), _) => (DeclaredVersion::Raw(raw), DeclaredSource::Operator),
        (None, Some(root)) => (DeclaredVersion::Parsed(root), DeclaredSource::Document),
        (None, None) => (DeclaredVersion::Parsed(software), DeclaredSource::Software),
    }
}

/// Declared version before parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredVersion<'a> {
    /// Unparsed attribute text
    Raw(&'a str),
    /// Already-parsed version
    Parsed(&'a VersionNumber),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> VersionNumber {
        s.parse().unwrap()
    }

    #[test]
    fn pinned_to_change_after_declared() {
        let history = CompatibilityHistory::new(v("9.0.0"), vec![v("6.0.0")]);
        let resolution = history.resolve(&v("5.0.0"));
        assert_eq!(resolution.working, v("6.0.0"));
        assert!(resolution.is_pinned());
    }

    #[test]
    fn newer_than_every_change_runs_latest() {
        let history = CompatibilityHistory::new(v("9.0.0"), vec![v("6.0.0")]);
        let resolution = history.resolve(&v("7.2.0"));
        assert_eq!(resolution.working, v("9.0.0"));
        assert!(!resolution.is_pinned());
    }

    #[test]
    fn empty_history_runs_latest() {
        let history = CompatibilityHistory::stable(v("9.0.0"));
        assert_eq!(history.resolve(&v("1.0.0")).working, v("9.0.0"));
    }

    #[test]
    fn boundary_is_inclusive() {
        let history = CompatibilityHistory::new(v("9.0.0"), vec![v("6.0.0")]);
        assert_eq!(history.resolve(&v("6.0.0")).working, v("6.0.0"));
    }

    #[test]
    fn greatest_matching_change_wins() {
        let history = CompatibilityHistory::new(v("9.0.0"), vec![v("8.0.0"), v("6.0.0"), v("7.0.0")]);
        assert_eq!(history.incompatible_changes(), &[v("6.0.0"), v("7.0.0"), v("8.0.0")]);
        assert_eq!(history.resolve(&v("5.0.0")).working, v("8.0.0"));
        assert_eq!(history.resolve(&v("8.1.0")).working, v("9.0.0"));
    }

    #[test]
    fn effective_declared_precedence() {
        let root = v("5.0.0");
        let software = v("9.0.0");

        let (declared, source) = effective_declared(Some("6.1"), Some(&root), &software);
        assert_eq!(declared, DeclaredVersion::Raw("6.1"));
        assert_eq!(source, DeclaredSource::Operator);

        let (declared, source) = effective_declared(None, Some(&root), &software);
        assert_eq!(declared, DeclaredVersion::Parsed(&root));
        assert_eq!(source, DeclaredSource::Document);

        let (_, source) = effective_declared(None, None, &software);
        assert_eq!(source, DeclaredSource::Software);
    }
}
