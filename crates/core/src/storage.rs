//! Persistence backend trait: a durable string key-value store.
//!
//! The playbook is stored as one JSON document per work, under a key derived
//! from the work id. Backends only move bytes; repair and (de)serialization
//! happen in the memory crate's `BulletStore`.
//!
//! Implementations: file, SQLite, in-memory (for testing), none (no-op).

use async_trait::async_trait;
use crate::error::StorageError;

#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// The backend name (e.g., "file", "sqlite", "none").
    fn name(&self) -> &str;

    /// Fetch the value stored under `key`, if any.
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> std::result::Result<(), StorageError>;

    /// Remove `key`. Returns whether a value existed.
    async fn remove(&self, key: &str) -> std::result::Result<bool, StorageError>;
}
