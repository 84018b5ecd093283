//! Configuration loading, validation, and management for quillmind.
//!
//! Loads configuration from `~/.quillmind/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.quillmind/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Retrieval, dedup, and rendering knobs
    #[serde(default)]
    pub playbook: PlaybookConfig,

    /// Embedding provider selection
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Persistence backend selection
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookConfig {
    /// Number of bullets the retriever returns for a recall
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Token budget for the injection view
    #[serde(default = "default_injection_budget")]
    pub injection_token_budget: usize,

    /// Token budget for the curator view
    #[serde(default = "default_curator_budget")]
    pub curator_token_budget: usize,

    /// Cosine similarity at or above which a new bullet merges into an existing one
    #[serde(default = "default_near_duplicate_threshold")]
    pub near_duplicate_threshold: f32,

    /// Retrieval scores at or below this are discarded
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Minimum content length (characters, after trimming) for a new bullet
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,

    /// Cap on query tokens used by the lexical fallback
    #[serde(default = "default_max_query_tokens")]
    pub max_query_tokens: usize,
}

fn default_top_k() -> usize {
    8
}
fn default_injection_budget() -> usize {
    600
}
fn default_curator_budget() -> usize {
    2000
}
fn default_near_duplicate_threshold() -> f32 {
    0.92
}
fn default_min_similarity() -> f32 {
    0.25
}
fn default_min_content_chars() -> usize {
    8
}
fn default_max_query_tokens() -> usize {
    8
}

impl Default for PlaybookConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            injection_token_budget: default_injection_budget(),
            curator_token_budget: default_curator_budget(),
            near_duplicate_threshold: default_near_duplicate_threshold(),
            min_similarity: default_min_similarity(),
            min_content_chars: default_min_content_chars(),
            max_query_tokens: default_max_query_tokens(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "none", "openai", "openrouter", "ollama", "hashing", or "custom"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Base URL override (required for "custom")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Vector width for the local hashing embedder
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

fn default_embedding_provider() -> String {
    "none".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_dimensions() -> usize {
    256
}

impl EmbeddingConfig {
    /// Whether any embedding provider is selected.
    pub fn is_enabled(&self) -> bool {
        !self.provider.is_empty() && self.provider != "none"
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            api_url: None,
            api_key: None,
            dimensions: default_dimensions(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "file", "sqlite", "memory", or "none"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Directory (file) or database path (sqlite); defaults under the config dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_storage_backend() -> String {
    "file".into()
}

impl StorageConfig {
    /// Resolve the on-disk location for the selected backend.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        match self.backend.as_str() {
            "sqlite" => AppConfig::config_dir().join("playbooks.sqlite"),
            _ => AppConfig::config_dir().join("playbooks"),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.quillmind/config.toml).
    ///
    /// Also checks environment variables:
    /// - `QUILLMIND_API_KEY`, then `OPENAI_API_KEY` (embedding api key)
    /// - `QUILLMIND_EMBEDDING_PROVIDER`
    /// - `QUILLMIND_STORAGE_BACKEND`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply the same environment overrides as [`AppConfig::load`].
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;

        if config.embedding.api_key.is_none() {
            config.embedding.api_key = std::env::var("QUILLMIND_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("QUILLMIND_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }

        if let Ok(backend) = std::env::var("QUILLMIND_STORAGE_BACKEND") {
            config.storage.backend = backend;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".quillmind")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.playbook;
        if !(-1.0..=1.0).contains(&p.near_duplicate_threshold) {
            return Err(ConfigError::ValidationError(
                "playbook.near_duplicate_threshold must be between -1.0 and 1.0".into(),
            ));
        }
        if !(-1.0..=1.0).contains(&p.min_similarity) {
            return Err(ConfigError::ValidationError(
                "playbook.min_similarity must be between -1.0 and 1.0".into(),
            ));
        }
        if p.top_k == 0 {
            return Err(ConfigError::ValidationError("playbook.top_k must be >= 1".into()));
        }
        if p.injection_token_budget == 0 || p.curator_token_budget == 0 {
            return Err(ConfigError::ValidationError(
                "playbook token budgets must be >= 1".into(),
            ));
        }
        if p.min_content_chars == 0 || p.max_query_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "playbook.min_content_chars and playbook.max_query_tokens must be >= 1".into(),
            ));
        }
        if self.embedding.provider == "custom" && self.embedding.api_url.is_none() {
            return Err(ConfigError::ValidationError(
                "embedding.api_url is required for the custom provider".into(),
            ));
        }
        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.playbook.top_k, 8);
        assert!((config.playbook.near_duplicate_threshold - 0.92).abs() < f32::EPSILON);
        assert!((config.playbook.min_similarity - 0.25).abs() < f32::EPSILON);
        assert!(!config.embedding.is_enabled());
        assert_eq!(config.storage.backend, "file");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.playbook.top_k, config.playbook.top_k);
        assert_eq!(parsed.embedding.provider, config.embedding.provider);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
[playbook]
top_k = 3

[embedding]
provider = "hashing"
"#,
        )
        .unwrap();
        assert_eq!(config.playbook.top_k, 3);
        assert_eq!(config.playbook.min_content_chars, 8);
        assert!(config.embedding.is_enabled());
        assert_eq!(config.embedding.dimensions, 256);
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let mut config = AppConfig::default();
        config.playbook.near_duplicate_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn zero_top_k_rejected() {
        let result = AppConfig::from_toml_str("[playbook]\ntop_k = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn custom_provider_requires_url() {
        let result = AppConfig::from_toml_str("[embedding]\nprovider = \"custom\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().storage.backend, "file");
    }

    #[test]
    fn load_from_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[playbook\n").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = EmbeddingConfig {
            api_key: Some("sk-secret".into()),
            ..EmbeddingConfig::default()
        };
        let out = format!("{config:?}");
        assert!(!out.contains("sk-secret"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn storage_path_defaults_by_backend() {
        let sqlite = StorageConfig {
            backend: "sqlite".into(),
            path: None,
        };
        assert!(sqlite.resolved_path().ends_with("playbooks.sqlite"));
        let explicit = StorageConfig {
            backend: "file".into(),
            path: Some(PathBuf::from("/data/pb")),
        };
        assert_eq!(explicit.resolved_path(), PathBuf::from("/data/pb"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("near_duplicate_threshold"));
        assert!(toml_str.contains("injection_token_budget"));
    }
}
