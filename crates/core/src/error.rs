//! Error types for the quillmind domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Storage and embedding
//! failures are *transient provider failures*: backends and providers return
//! them, and the memory crate catches them at its boundary, logs them, and
//! continues degraded. Nothing here is fatal to the host process.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read key {key}: {reason}")]
    Read { key: String, reason: String },

    #[error("Failed to write key {key}: {reason}")]
    Write { key: String, reason: String },

    #[error("Failed to (de)serialize playbook: {0}")]
    Serialization(String),

    #[error("Backend unavailable: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited by embedding provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Embedding API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_error_displays_correctly() {
        let err = EmbeddingError::Api {
            status_code: 429,
            message: "quota exceeded".into(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn storage_error_names_the_key() {
        let err = StorageError::Write {
            key: "ace_playbook:w1".into(),
            reason: "disk full".into(),
        };
        assert!(err.to_string().contains("ace_playbook:w1"));
        assert!(err.to_string().contains("disk full"));
    }
}
