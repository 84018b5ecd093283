//! Command implementations and shared wiring.

pub mod onboard;
pub mod playbook;

use quillmind_config::AppConfig;
use quillmind_core::storage::PersistenceBackend;
use quillmind_memory::{BulletStore, Embeddings, FileBackend, InMemoryBackend, NoopBackend, PlaybookService};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Load config from `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    };
    Ok(config.map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Build the persistence backend named in `[storage]`.
pub async fn build_backend(
    config: &AppConfig,
) -> Result<Arc<dyn PersistenceBackend>, Box<dyn std::error::Error>> {
    let backend: Arc<dyn PersistenceBackend> = match config.storage.backend.as_str() {
        "file" => Arc::new(FileBackend::new(config.storage.resolved_path())),
        "memory" => Arc::new(InMemoryBackend::new()),
        "none" => Arc::new(NoopBackend),
        #[cfg(feature = "sqlite")]
        "sqlite" => Arc::new(quillmind_memory::SqliteBackend::new(config.storage.resolved_path()).await?),
        other => {
            warn!(backend = %other, "Unknown storage backend, falling back to file");
            Arc::new(FileBackend::new(config.storage.resolved_path()))
        }
    };
    debug!(backend = %backend.name(), "Storage backend ready");
    Ok(backend)
}

/// Wire store, embeddings, and playbook settings into a service.
pub async fn build_service(config: &AppConfig) -> Result<PlaybookService, Box<dyn std::error::Error>> {
    let store = BulletStore::new(build_backend(config).await?);
    let embeddings = Embeddings::from_option(quillmind_providers::build_embedder(&config.embedding));
    debug!(provider = %embeddings.provider_name(), "Embeddings configured");
    Ok(PlaybookService::new(store, embeddings, &config.playbook))
}
