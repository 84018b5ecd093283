//! File-based backend: one JSON document per key.
//!
//! Storage location: `~/.quillmind/playbooks/` by default. Each key maps to
//! `<sanitized-key>-<hash>.json`; the hash suffix keeps distinct keys from
//! colliding after sanitization. Writes go to a temp file in the same
//! directory and are renamed into place, so a crash never leaves a torn
//! document behind.

use async_trait::async_trait;
use quillmind_core::error::StorageError;
use quillmind_core::storage::PersistenceBackend;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// A directory of JSON documents.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(dir = %dir.display(), "File playbook backend ready");
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document holding `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .take(64)
            .collect();
        let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{sanitized}-{}.json", &digest[..12]))
    }
}

#[async_trait]
impl PersistenceBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Read {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let write_err = |e: std::io::Error| StorageError::Write {
            key: key.to_string(),
            reason: e.to_string(),
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(write_err)?;

        let target = self.path_for(key);
        let tmp = target.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, value.as_bytes()).await.map_err(write_err)?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Write {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
