//! Deterministic local embedder: hashed bag-of-words vectors.
//!
//! No network, no model files. Each lowercase alphanumeric token is hashed
//! (SHA-256) into one of `dimensions` buckets with a sign bit, and the result
//! is L2-normalised. Identical token multisets give identical vectors, so the
//! near-duplicate check catches reorderings and case changes offline.

use async_trait::async_trait;
use quillmind_core::embedding::Embedder;
use quillmind_core::error::EmbeddingError;
use sha2::{Digest, Sha256};

pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let digest = Sha256::digest(token.as_bytes());
            let bucket = u64::from_le_bytes([
                digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
            ]) as usize
                % self.dimensions;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let vector = self.vectorize(text);
        if vector.iter().all(|v| *v == 0.0) {
            return Err(EmbeddingError::InvalidResponse(
                "text has no alphanumeric tokens".into(),
            ));
        }
        Ok(vector)
    }
}
