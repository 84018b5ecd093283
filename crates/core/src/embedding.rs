//! Embedding provider trait: turns text into a dense vector.
//!
//! Implementations: OpenAI-compatible HTTP endpoints and a deterministic
//! local hashing embedder (see `quillmind-providers`). Any error returned
//! here is treated by callers as "no embedding" and never retried.

use async_trait::async_trait;
use crate::error::EmbeddingError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Provider name for logs (e.g., "openai", "hashing").
    fn name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError>;
}
