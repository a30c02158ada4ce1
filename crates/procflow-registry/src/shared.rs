//! Copy-on-write process-wide state
//!
//! Imports read registries through cheap [`Arc`] snapshots and never hold a
//! lock while they run. Loading more types or rules clones the current value,
//! edits the clone and publishes it under a write lock, so writers are
//! serialized and readers keep whatever snapshot they already took.

use crate::registry::OperatorRegistry;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use procflow_model::VersionNumber;
use std::sync::Arc;

/// Copy-on-write cell
#[derive(Debug, Default)]
pub struct Shared<T> {
    current: RwLock<Arc<T>>,
}

impl<T: Clone> Shared<T> {
    /// Create cell holding `value`
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
        }
    }

    /// Current value
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Arc<T> {
        Arc::clone(&self.current.read())
    }

    /// Edit a copy of the current value and publish it
    pub fn update<R>(&self, edit: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.current.write();
        let mut next = T::clone(&guard);
        let result = edit(&mut next);
        *guard = Arc::new(next);
        result
    }

    /// Like [`Shared::update`], but publish only if `edit` succeeds
    ///
    /// # Errors
    /// Returns the error of `edit`; the current value is left unchanged.
    pub fn try_update<R, E>(&self, edit: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E> {
        let mut guard = self.current.write();
        let mut next = T::clone(&guard);
        let result = edit(&mut next)?;
        *guard = Arc::new(next);
        Ok(result)
    }

    /// Replace the current value
    pub fn replace(&self, value: T) {
        *self.current.write() = Arc::new(value);
    }
}

/// Software version the process-wide registry is initialized with
pub const SOFTWARE_VERSION: VersionNumber = VersionNumber::new(9, 0, 0);

static GLOBAL: Lazy<Shared<OperatorRegistry>> =
    Lazy::new(|| Shared::new(OperatorRegistry::with_root(SOFTWARE_VERSION)));

/// Process-wide operator registry
#[must_use]
pub fn global() -> &'static Shared<OperatorRegistry> {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::OperatorDescriptor;
    use crate::error::RegistryError;

    #[test]
    fn snapshots_are_stable_across_updates() {
        let shared = Shared::new(OperatorRegistry::new());
        let before = shared.snapshot();
        shared
            .try_update(|r| r.register(OperatorDescriptor::new("a", SOFTWARE_VERSION)))
            .unwrap();
        assert!(!before.contains("a"));
        assert!(shared.snapshot().contains("a"));
    }

    #[test]
    fn failed_update_publishes_nothing() {
        let shared = Shared::new(OperatorRegistry::new());
        let result: Result<(), RegistryError> = shared.try_update(|r| {
            r.register(OperatorDescriptor::new("a", SOFTWARE_VERSION))?;
            r.register(OperatorDescriptor::new("a", SOFTWARE_VERSION))
        });
        assert!(result.is_err());
        assert!(shared.snapshot().is_empty());
    }

    #[test]
    fn global_has_root() {
        assert!(global().snapshot().contains(crate::ROOT_KEY));
    }
}
