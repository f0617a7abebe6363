//! Configuration management
//!
//! A single [`Config`] is loaded once per process (YAML file plus
//! `SMARTLEASE_*` environment overrides) and handed to each component at
//! construction time.

use crate::error::{Result, SmartLeaseError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM and embedding service configuration
    #[serde(default)]
    pub llm_service: LLMServiceConfig,

    /// Retrieval and ranking parameters
    #[serde(default)]
    pub search: SearchConfig,

    /// Property store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// LLM service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of the LLM service for chat/completions
    #[serde(default = "default_llm_url")]
    pub url: String,

    /// Model name for chat completions (metadata extraction, re-ranking)
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL for embeddings service (can be different from LLM URL)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Requested output size, for models that can shorten their vectors.
    /// Omitted from requests when unset.
    #[serde(default)]
    pub embedding_dimensions: Option<usize>,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Maximum tokens requested per completion
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
            url: default_llm_url(),
            model: default_chat_model(),
            embedding_url: None,
            embedding_model: default_embedding_model(),
            embedding_dimensions: None,
            api_key: None,
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_llm_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_chat_model() -> String {
    "gpt-4".to_string()
}

fn default_embedding_model() -> String {
    "snowflake-arctic-embed-l-v2.0".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_tokens() -> u32 {
    1024
}

/// Retrieval and ranking parameters.
///
/// The defaults are the production values; the relative sizes of the pools
/// and the keyword boost are what ranking depends on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Rows taken from the unfiltered cosine ranking
    pub semantic_pool: usize,
    /// Rows taken from the filtered cosine ranking
    pub filtered_pool: usize,
    /// Candidates kept after merge and sort
    pub final_k: usize,
    /// Additive score bonus for rows that matched the extracted filters
    pub keyword_boost: f64,
    /// Candidates sent to the LLM re-ranker
    pub rerank_candidates: usize,
    /// Temperature for metadata extraction
    pub extraction_temperature: f32,
    /// Temperature for re-ranking prose
    pub rerank_temperature: f32,
    /// Directory for per-request step snapshots (disabled when unset)
    pub step_log_dir: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            semantic_pool: 20,
            filtered_pool: 20,
            final_k: 6,
            keyword_boost: 0.1,
            rerank_candidates: 6,
            extraction_temperature: 0.0,
            rerank_temperature: 0.7,
            step_log_dir: None,
        }
    }
}

/// Property store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path (defaults to the user cache directory)
    pub path: Option<PathBuf>,
    /// Number of pooled connections
    pub pool_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            pool_size: 4,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_addr: String,
    /// Upper bound on the full search chain per request
    pub request_timeout_secs: u64,
    /// Searches allowed to run at once
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            request_timeout_secs: 120,
            max_concurrent_requests: 8,
        }
    }
}

impl Config {
    /// Load config from the default path, then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = std::env::var("SMARTLEASE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Config::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from an explicit YAML file (no environment overrides)
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse config from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Resolve the database path (`SMARTLEASE_DB` wins over the config file)
    pub fn database_path(&self) -> PathBuf {
        std::env::var("SMARTLEASE_DB")
            .map(PathBuf::from)
            .ok()
            .or_else(|| self.store.path.clone())
            .unwrap_or_else(crate::db::Database::default_path)
    }

    /// Apply `SMARTLEASE_*` environment variables on top of file values
    pub fn apply_env_overrides(&mut self) {
        let llm = &mut self.llm_service;
        if let Ok(url) = std::env::var("SMARTLEASE_LLM_URL") {
            llm.url = url;
        }
        if let Ok(model) = std::env::var("SMARTLEASE_LLM_MODEL") {
            llm.model = model;
        }
        if let Ok(key) = std::env::var("SMARTLEASE_LLM_API_KEY") {
            llm.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("SMARTLEASE_EMBEDDING_URL") {
            llm.embedding_url = Some(url);
        }
        if let Ok(model) = std::env::var("SMARTLEASE_EMBEDDING_MODEL") {
            llm.embedding_model = model;
        }
        if let Some(dims) = std::env::var("SMARTLEASE_EMBEDDING_DIMS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            llm.embedding_dimensions = Some(dims);
        }
        if let Ok(addr) = std::env::var("SMARTLEASE_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Ok(dir) = std::env::var("SMARTLEASE_STEP_LOG_DIR") {
            self.search.step_log_dir = Some(PathBuf::from(dir));
        }
    }

    /// Reject values that would make the pipeline degenerate
    pub fn validate(&self) -> Result<()> {
        let search = &self.search;
        if search.final_k == 0 || search.semantic_pool == 0 || search.filtered_pool == 0 {
            return Err(SmartLeaseError::Config(
                "search pool sizes and final_k must be greater than zero".to_string(),
            ));
        }
        if !search.keyword_boost.is_finite() {
            return Err(SmartLeaseError::Config(
                "search.keyword_boost must be finite".to_string(),
            ));
        }
        if self.store.pool_size == 0 {
            return Err(SmartLeaseError::Config(
                "store.pool_size must be greater than zero".to_string(),
            ));
        }
        if self.server.max_concurrent_requests == 0 {
            return Err(SmartLeaseError::Config(
                "server.max_concurrent_requests must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_production_values() {
        let config = Config::default();
        assert_eq!(config.search.semantic_pool, 20);
        assert_eq!(config.search.filtered_pool, 20);
        assert_eq!(config.search.final_k, 6);
        assert!((config.search.keyword_boost - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.search.extraction_temperature, 0.0);
        assert!((config.search.rerank_temperature - 0.7).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
llm_service:
  url: http://inference:9000
  api_key: secret
search:
  final_k: 3
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.llm_service.url, "http://inference:9000");
        assert_eq!(config.llm_service.api_key.as_deref(), Some("secret"));
        assert_eq!(config.llm_service.timeout_secs, 30);
        assert_eq!(config.search.final_k, 3);
        assert_eq!(config.search.semantic_pool, 20);
        assert_eq!(config.store.pool_size, 4);
    }

    #[test]
    fn test_embeddings_url_fallback() {
        let mut llm = LLMServiceConfig::default();
        assert_eq!(llm.embeddings_url(), "http://localhost:8000");
        llm.embedding_url = Some("http://embed:8001".to_string());
        assert_eq!(llm.embeddings_url(), "http://embed:8001");
    }

    #[test]
    fn test_validate_rejects_zero_k() {
        let mut config = Config::default();
        config.search.final_k = 0;
        assert!(matches!(
            config.validate(),
            Err(SmartLeaseError::Config(_))
        ));
    }
}
