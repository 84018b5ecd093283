//! No-op backend: disables persistence entirely.
//!
//! Playbooks still work in memory for the lifetime of one call chain, but
//! every load starts empty.

use async_trait::async_trait;
use quillmind_core::error::StorageError;
use quillmind_core::storage::PersistenceBackend;

/// A no-op backend that stores nothing.
pub struct NoopBackend;

#[async_trait]
impl PersistenceBackend for NoopBackend {
    fn name(&self) -> &str { "none" }

    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), StorageError> {
        Ok(())
    }

    async fn remove(&self, _key: &str) -> Result<bool, StorageError> {
        Ok(false)
    }
}
