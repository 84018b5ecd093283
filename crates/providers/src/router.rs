//! Embedder factory: selects the embedding provider based on config.

use std::sync::Arc;
use quillmind_config::EmbeddingConfig;
use quillmind_core::embedding::Embedder;
use tracing::{info, warn};
use crate::hashing::HashingEmbedder;
use crate::openai_compat::OpenAiCompatEmbedder;

/// Build the configured embedder, or `None` when embeddings are disabled.
///
/// Unknown provider names are logged and treated as disabled so that the
/// playbook keeps working with exact dedup and lexical retrieval.
pub fn build_embedder(config: &EmbeddingConfig) -> Option<Arc<dyn Embedder>> {
    if !config.is_enabled() {
        return None;
    }

    let api_key = config.api_key.clone().unwrap_or_default();
    let model = config.model.clone();

    let embedder: Arc<dyn Embedder> = match config.provider.as_str() {
        "hashing" => Arc::new(HashingEmbedder::new(config.dimensions)),
        "ollama" => Arc::new(OpenAiCompatEmbedder::ollama(config.api_url.as_deref(), model)),
        "openai" | "openrouter" | "custom" => {
            let base_url = config
                .api_url
                .clone()
                .unwrap_or_else(|| default_base_url(&config.provider));
            Arc::new(OpenAiCompatEmbedder::new(
                config.provider.clone(),
                base_url,
                api_key,
                model,
            ))
        }
        other => {
            warn!(provider = %other, "Unknown embedding provider; embeddings disabled");
            return None;
        }
    };

    info!(provider = %embedder.name(), "Embedding provider configured");
    Some(embedder)
}

/// Default base URL for a named provider.
fn default_base_url(provider: &str) -> String {
    match provider {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        _ => "https://api.openai.com/v1".into(),
    }
}
