//! Operator parameters
//!
//! Parameters are kept in insertion order so that exported documents list
//! them the way they were read.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Shape of a parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// Plain string value
    #[default]
    Single,
    /// Ordered key/value pairs
    List,
    /// Ordered values
    Enumeration,
}

/// Value of one parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterValue {
    /// `<parameter key value/>`
    Single(String),
    /// `<list key>` of key/value entries
    List(Vec<(String, String)>),
    /// `<enumeration key>` of ordered values
    Enumeration(Vec<String>),
}

impl ParameterValue {
    /// Shape of this value
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ParameterKind {
        match self {
            Self::Single(_) => ParameterKind::Single,
            Self::List(_) => ParameterKind::List,
            Self::Enumeration(_) => ParameterKind::Enumeration,
        }
    }

    /// String value if single
    #[inline]
    #[must_use]
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

/// Ordered parameter map of one operator
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Parameters(IndexMap<String, ParameterValue>);

impl Parameters {
    /// Create empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Value for `key`
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.0.get(key)
    }

    /// Mutable value for `key`
    #[inline]
    pub fn get_mut(&mut self, key: &str) -> Option<&mut ParameterValue> {
        self.0.get_mut(key)
    }

    /// Single string value for `key`
    #[inline]
    #[must_use]
    pub fn get_single(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(ParameterValue::as_single)
    }

    /// Whether `key` is set
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Set a value, keeping the position of an existing key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParameterValue>) -> Option<ParameterValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a value, preserving the order of the rest
    #[inline]
    pub fn remove(&mut self, key: &str) -> Option<ParameterValue> {
        self.0.shift_remove(key)
    }

    /// Move the value of `from` to `to` in place
    ///
    /// An existing `to` value is overwritten. Returns `false` if `from` is not set.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        if !self.0.contains_key(from) {
            return false;
        }
        if from == to {
            return true;
        }
        self.0.shift_remove(to);
        if let Some((index, _, value)) = self.0.shift_remove_full(from) {
            self.0.shift_insert(index, to.to_string(), value);
        }
        true
    }

    /// Iterate entries in order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys in order
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of set parameters
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no parameter is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<ParameterValue>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut params = Parameters::new();
        params.set("a", "1");
        params.set("b", ParameterValue::List(vec![("x".into(), "y".into())]));
        assert_eq!(params.get_single("a"), Some("1"));
        assert_eq!(params.get("b").map(ParameterValue::kind), Some(ParameterKind::List));
        assert_eq!(params.get_single("b"), None);
    }

    #[test]
    fn rename_keeps_position() {
        let mut params: Parameters = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        assert!(params.rename("b", "z"));
        let keys: Vec<_> = params.keys().collect();
        assert_eq!(keys, vec!["a", "z", "c"]);
        assert_eq!(params.get_single("z"), Some("2"));
    }

    #[test]
    fn rename_overwrites_target() {
        let mut params: Parameters = [("old", "new value"), ("new", "stale")].into_iter().collect();
        assert!(params.rename("old", "new"));
        assert_eq!(params.len(), 1);
        assert_eq!(params.get_single("new"), Some("new value"));
    }

    #[test]
    fn rename_missing_is_noop() {
        let mut params: Parameters = [("a", "1")].into_iter().collect();
        assert!(!params.rename("missing", "b"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn remove_preserves_order() {
        let mut params: Parameters = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        params.remove("a");
        let keys: Vec<_> = params.keys().collect();
        assert_eq!(keys, vec!["b", "c"]);
    }
}
