//! OpenAI-compatible embedding provider.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, and any endpoint
//! exposing `POST {base}/embeddings` with the OpenAI request/response shape.

use async_trait::async_trait;
use quillmind_core::embedding::Embedder;
use quillmind_core::error::EmbeddingError;
use serde::Deserialize;
use tracing::debug;

/// An OpenAI-compatible embedding client.
pub struct OpenAiCompatEmbedder {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatEmbedder {
    /// Create a new OpenAI-compatible embedder.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    /// Create an OpenAI embedder (convenience constructor).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key, model)
    }

    /// Create an OpenRouter embedder (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key, model)
    }

    /// Create an Ollama embedder (convenience constructor).
    pub fn ollama(base_url: Option<&str>, model: impl Into<String>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
            model,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Embedder for OpenAiCompatEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
            "encoding_format": "float",
        });

        debug!(
            provider = %self.name,
            model = %self.model,
            chars = text.len(),
            "Sending embedding request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(EmbeddingError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(EmbeddingError::AuthenticationFailed(
                "Invalid API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: EmbeddingApiResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        first_embedding(api_resp)
    }
}

/// Pull the single vector out of an embeddings response.
fn first_embedding(resp: EmbeddingApiResponse) -> Result<Vec<f32>, EmbeddingError> {
    let vector = resp
        .data
        .into_iter()
        .min_by_key(|d| d.index)
        .map(|d| d.embedding)
        .ok_or_else(|| EmbeddingError::InvalidResponse("response contained no embeddings".into()))?;

    if vector.is_empty() {
        return Err(EmbeddingError::InvalidResponse("empty embedding vector".into()));
    }
    Ok(vector)
}

// --- Embedding API types ---

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    #[allow(dead_code)]
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}
