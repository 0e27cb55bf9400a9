//! Configuration management

pub mod settings;

pub use settings::Settings;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Chat, vision and embedding service configuration
    #[serde(default)]
    pub llm: LLMServiceConfig,

    /// Cross-encoder rerank service (optional)
    #[serde(default)]
    pub rerank: RerankServiceConfig,

    /// Vector index configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Retrieval and grounding thresholds
    #[serde(default)]
    pub settings: Settings,
}

/// LLM service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of the LLM service for chat/completions (vision and generation)
    pub url: String,

    /// Model name for chat completions
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL for embeddings service (can be different from LLM URL)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature for generation
    #[serde(default)]
    pub temperature: f32,

    /// Maximum tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl LLMServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("SAFETYVISION_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            model: default_chat_model(),
            embedding_url: std::env::var("SAFETYVISION_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            api_key: std::env::var("SAFETYVISION_LLM_API_KEY").ok(),
            timeout_secs: default_timeout(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_chat_model() -> String {
    std::env::var("SAFETYVISION_LLM_MODEL").unwrap_or_else(|_| "/model/qwen3-vl-4b".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("SAFETYVISION_EMBEDDING_MODEL").unwrap_or_else(|_| "/model/bge-m3".to_string())
}

fn default_rerank_model() -> String {
    std::env::var("SAFETYVISION_RERANK_MODEL")
        .unwrap_or_else(|_| "/model/bge-reranker-v2-m3".to_string())
}

fn default_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    4096
}

/// Rerank service configuration
///
/// Reranking is disabled when no URL is configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankServiceConfig {
    /// Base URL of a Cohere-compatible rerank endpoint
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_rerank_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for RerankServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("SAFETYVISION_RERANK_URL")
                .ok()
                .filter(|u| !u.trim().is_empty()),
            model: default_rerank_model(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Qdrant base URL
    pub url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Collection holding regulations (PDF, Word, Markdown)
    #[serde(default = "default_regulations_collection")]
    pub regulations_collection: String,

    /// Collection holding the structured hazard database (Excel)
    #[serde(default = "default_hazard_db_collection")]
    pub hazard_db_collection: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("SAFETYVISION_QDRANT_URL")
                .unwrap_or_else(|_| "http://localhost:6333".to_string()),
            api_key: std::env::var("SAFETYVISION_QDRANT_API_KEY").ok(),
            regulations_collection: default_regulations_collection(),
            hazard_db_collection: default_hazard_db_collection(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_regulations_collection() -> String {
    "rag-regulations".to_string()
}

fn default_hazard_db_collection() -> String {
    "rag-hazard-db".to_string()
}

impl Config {
    /// Load config from a specific path, falling back to defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str::<Config>(&content)?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Config::default()
        };
        config.settings.validate()?;
        Ok(config)
    }

    /// Save config to the given path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.yml")).unwrap();
        assert_eq!(config.index.regulations_collection, "rag-regulations");
        assert_eq!(config.index.hazard_db_collection, "rag-hazard-db");
        assert_eq!(config.settings.min_sufficient_docs, 2);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(
            &path,
            "index:\n  url: http://qdrant:6333\n  regulations_collection: regs\nsettings:\n  min_retrieval_score: 0.35\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.index.url, "http://qdrant:6333");
        assert_eq!(config.index.regulations_collection, "regs");
        assert_eq!(config.index.hazard_db_collection, "rag-hazard-db");
        assert!((config.settings.min_retrieval_score - 0.35).abs() < 1e-9);
        assert_eq!(config.settings.max_combined_docs, 5);
    }

    #[test]
    fn test_invalid_settings_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "settings:\n  fetch_k_multiplier: 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::exit_codes::INVALID_INPUT);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yml");
        let mut config = Config::default();
        config.settings.max_hazards = 3;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.settings.max_hazards, 3);
    }
}
