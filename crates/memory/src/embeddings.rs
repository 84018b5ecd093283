//! The embedding boundary.
//!
//! Every embedding call made by the playbook goes through [`Embeddings`].
//! Provider failures stop here: they are logged and turned into `None`, and
//! the caller carries on with exact dedup or lexical retrieval. No retries.

use std::sync::Arc;
use quillmind_core::embedding::Embedder;
use tracing::warn;

/// Optional embedder handle shared by the delta applier and retriever.
#[derive(Clone, Default)]
pub struct Embeddings {
    embedder: Option<Arc<dyn Embedder>>,
}

impl Embeddings {
    /// Embeddings turned off: exact dedup and lexical ranking only.
    pub fn disabled() -> Self {
        Self { embedder: None }
    }

    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder: Some(embedder),
        }
    }

    pub fn from_option(embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self { embedder }
    }

    pub fn is_enabled(&self) -> bool {
        self.embedder.is_some()
    }

    pub fn provider_name(&self) -> &str {
        self.embedder.as_ref().map(|e| e.name()).unwrap_or("none")
    }

    /// Embed `text`, or `None` if disabled or the provider failed.
    pub async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        match embedder.embed(text).await {
            Ok(vector) if !vector.is_empty() => Some(vector),
            Ok(_) => {
                warn!(provider = %embedder.name(), "Embedding provider returned an empty vector");
                None
            }
            Err(e) => {
                warn!(provider = %embedder.name(), error = %e, "Embedding failed, continuing without it");
                None
            }
        }
    }
}

impl std::fmt::Debug for Embeddings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embeddings")
            .field("provider", &self.provider_name())
            .finish()
    }
}
