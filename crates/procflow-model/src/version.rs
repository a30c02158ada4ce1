//! Three-part version numbers
//!
//! Provides [`VersionNumber`], used for document versions, operator
//! compatibility levels and the incompatible-change history of operator types.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Version assumed for documents and operators whose version cannot be determined
pub const DEFAULT_VERSION: VersionNumber = VersionNumber::new(5, 0, 0);

/// Version at which documents switched from nested `operator` tags to `process` wrappers
pub const PROCESS_LAYOUT_VERSION: VersionNumber = VersionNumber::new(5, 0, 0);

/// Ordered `major.minor.patch` version number
///
/// The textual patch component may be zero-padded (`5.3.015`). An optional
/// classifier after a dash (`7.6.001-SNAPSHOT`) orders *before* the plain
/// release with the same numbers.
///
/// # Examples
/// - `"5"` → `5.0.000`
/// - `"5.3"` → `5.3.000`
/// - `"5.3.015"` → `5.3.015`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionNumber {
    major: u32,
    minor: u32,
    patch: u32,
    classifier: Option<String>,
}

/// Errors parsing a version string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// Empty input
    #[error("empty version string")]
    Empty,

    /// More than three numeric components
    #[error("too many version components in '{0}'")]
    TooManyComponents(String),

    /// A component is not a number
    #[error("invalid version component '{component}' in '{input}'")]
    InvalidComponent { input: String, component: String },
}

impl VersionNumber {
    /// Create release version
    #[inline]
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            classifier: None,
        }
    }

    /// Attach a pre-release classifier
    #[inline]
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Major component
    #[inline]
    #[must_use]
    pub const fn major(&self) -> u32 {
        self.major
    }

    /// Minor component
    #[inline]
    #[must_use]
    pub const fn minor(&self) -> u32 {
        self.minor
    }

    /// Patch component
    #[inline]
    #[must_use]
    pub const fn patch(&self) -> u32 {
        self.patch
    }

    /// Pre-release classifier, if any
    #[inline]
    #[must_use]
    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    /// `self <= other`
    #[inline]
    #[must_use]
    pub fn is_at_most(&self, other: &Self) -> bool {
        self <= other
    }

    /// `self < other`
    #[inline]
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self < other
    }
}

impl Default for VersionNumber {
    fn default() -> Self {
        DEFAULT_VERSION
    }
}

impl Ord for VersionNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.classifier, &other.classifier) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for VersionNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for VersionNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{:03}", self.major, self.minor, self.patch)?;
        if let Some(classifier) = &self.classifier {
            write!(f, "-{classifier}")?;
        }
        Ok(())
    }
}

impl FromStr for VersionNumber {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        let (numbers, classifier) = match trimmed.split_once('-') {
            Some((numbers, classifier)) if !classifier.is_empty() => {
                (numbers, Some(classifier.to_string()))
            }
            Some((numbers, _)) => (numbers, None),
            None => (trimmed, None),
        };

        let mut parts = [0u32; 3];
        let mut count = 0;
        for component in numbers.split('.') {
            if count == parts.len() {
                return Err(VersionError::TooManyComponents(s.to_string()));
            }
            parts[count] = component
                .parse()
                .map_err(|_| VersionError::InvalidComponent {
                    input: s.to_string(),
                    component: component.to_string(),
                })?;
            count += 1;
        }

        Ok(Self {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
            classifier,
        })
    }
}

impl TryFrom<String> for VersionNumber {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionNumber> for String {
    fn from(value: VersionNumber) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> VersionNumber {
        s.parse().unwrap()
    }

    #[test]
    fn parse_full_and_padded() {
        assert_eq!(v("5.3.015"), VersionNumber::new(5, 3, 15));
        assert_eq!(v("9.0.0"), VersionNumber::new(9, 0, 0));
    }

    #[test]
    fn parse_short_forms() {
        assert_eq!(v("5"), VersionNumber::new(5, 0, 0));
        assert_eq!(v("4.6"), VersionNumber::new(4, 6, 0));
    }

    #[test]
    fn parse_classifier() {
        let snapshot = v("7.6.001-SNAPSHOT");
        assert_eq!(snapshot.classifier(), Some("SNAPSHOT"));
        assert!(snapshot < VersionNumber::new(7, 6, 1));
        assert!(snapshot > VersionNumber::new(7, 6, 0));
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<VersionNumber>(), Err(VersionError::Empty));
        assert!(matches!(
            "1.2.3.4".parse::<VersionNumber>(),
            Err(VersionError::TooManyComponents(_))
        ));
        assert!(matches!(
            "five.0".parse::<VersionNumber>(),
            Err(VersionError::InvalidComponent { .. })
        ));
    }

    #[test]
    fn display_pads_patch() {
        assert_eq!(VersionNumber::new(5, 3, 15).to_string(), "5.3.015");
        assert_eq!(
            VersionNumber::new(7, 6, 1).with_classifier("beta").to_string(),
            "7.6.001-beta"
        );
    }

    #[test]
    fn ordering() {
        assert!(v("5.0") < v("5.0.1"));
        assert!(v("5.10") > v("5.9.999"));
        assert!(v("6.0.0").is_at_most(&v("6.0.0")));
        assert!(!v("6.0.0").is_before(&v("6.0.0")));
    }

    #[test]
    fn serde_as_string() {
        let json = serde_json::to_string(&VersionNumber::new(9, 0, 0)).unwrap();
        assert_eq!(json, "\"9.0.000\"");
        let back: VersionNumber = serde_json::from_str("\"6.1\"").unwrap();
        assert_eq!(back, VersionNumber::new(6, 1, 0));
    }
}
