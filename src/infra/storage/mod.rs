//! Durable key-value storage for cache snapshots.
//!
//! Backends are synchronous and store opaque strings. Failures are reported
//! to the caller, which decides whether they matter; the annotation cache
//! logs and swallows them.

mod file;
mod memory;
mod scoped;

use std::sync::Arc;

use thiserror::Error;

use crate::config::{StorageBackend, StorageSettings};

use super::error::InfraError;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use scoped::ScopedStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage quota exceeded writing `{key}`: {required} bytes required, limit {limit}")]
    QuotaExceeded {
        key: String,
        required: usize,
        limit: usize,
    },
    #[error("invalid storage key `{key}`")]
    InvalidKey { key: String },
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Synchronous string key-value store.
pub trait DurableStore: Send + Sync {
    /// Returns the stored value, or `None` when the key was never written.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replaces the value stored under `key`.
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Build the configured backend, scoped to `scope`.
pub fn open_backend(
    settings: &StorageSettings,
    scope: &str,
) -> Result<Arc<dyn DurableStore>, InfraError> {
    let inner: Arc<dyn DurableStore> = match settings.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => Arc::new(FileStore::open(&settings.directory)?),
    };

    let scoped = ScopedStore::new(inner, scope)
        .ok_or_else(|| InfraError::configuration("storage scope must not be empty"))?;
    Ok(Arc::new(scoped))
}
