//! Deterministic doubles for embedding and persistence.

use async_trait::async_trait;
use quillmind_core::embedding::Embedder;
use quillmind_core::error::{EmbeddingError, StorageError};
use quillmind_core::storage::PersistenceBackend;
use std::collections::HashMap;

/// Returns a fixed vector per known text and fails for anything else.
#[derive(Default)]
pub struct StaticEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl StaticEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }
}

#[async_trait]
impl Embedder for StaticEmbedder {
    fn name(&self) -> &str {
        "static"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| EmbeddingError::InvalidResponse(format!("no vector for {text:?}")))
    }
}

/// Always fails as if the network were down.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Network("connection refused".into()))
    }
}

/// Every read and write fails.
pub struct FailingBackend;

#[async_trait]
impl PersistenceBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Read {
            key: key.to_string(),
            reason: "disk unavailable".into(),
        })
    }

    async fn set(&self, key: &str, _value: String) -> Result<(), StorageError> {
        Err(StorageError::Write {
            key: key.to_string(),
            reason: "disk unavailable".into(),
        })
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Err(StorageError::Write {
            key: key.to_string(),
            reason: "disk unavailable".into(),
        })
    }
}
