use std::sync::Arc;

use super::{DurableStore, StoreError};

/// Prefixes every key with `"{scope}/"` so several sessions can share one backend.
#[derive(Clone)]
pub struct ScopedStore {
    inner: Arc<dyn DurableStore>,
    prefix: String,
}

impl ScopedStore {
    /// Returns `None` when `scope` is blank.
    pub fn new(inner: Arc<dyn DurableStore>, scope: &str) -> Option<Self> {
        let scope = scope.trim();
        if scope.is_empty() {
            return None;
        }
        Some(Self {
            inner,
            prefix: format!("{scope}/"),
        })
    }

    pub fn scope(&self) -> &str {
        self.prefix.trim_end_matches('/')
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

impl std::fmt::Debug for ScopedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedStore")
            .field("scope", &self.scope())
            .finish_non_exhaustive()
    }
}

impl DurableStore for ScopedStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.read(&self.scoped(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.write(&self.scoped(key), value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(&self.scoped(key))
    }
}
