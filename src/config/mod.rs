//! Configuration management for context-kit
//!
//! Supports configuration via:
//! 1. Config file (~/.config/context-kit/config.toml)
//! 2. Environment variables (REDIS_URL, OLLAMA_URL, etc.)
//! 3. CLI arguments (override file/env settings)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Token counting and model defaults
    pub tokens: TokenSettings,

    /// Context discovery and selection
    pub context: ContextSettings,

    /// General-purpose cache
    pub cache: CacheSettings,

    /// Embedding backend for semantic scoring
    pub embeddings: EmbeddingSettings,

    /// Ambient git/filesystem signals
    pub dynamic: DynamicSettings,
}

/// Token estimation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// Model used when none is given on the command line
    pub default_model: String,

    /// Context window assumed for models missing from the limit table
    pub fallback_context_limit: usize,

    /// Output tokens reserved by `validate` when not specified
    pub default_max_output_tokens: usize,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            default_model: "claude-sonnet-4-20250514".to_string(),
            fallback_context_limit: crate::tokens::FALLBACK_CONTEXT_LIMIT,
            default_max_output_tokens: 4096,
        }
    }
}

/// A directory scanned for context documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRoot {
    pub path: PathBuf,
    /// Category used for files placed directly in the root
    pub label: String,
}

impl ContextRoot {
    pub fn new(path: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
        }
    }
}

/// Multiplier applied to chunks whose category starts with `prefix`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBoost {
    pub prefix: String,
    pub boost: f32,
}

impl CategoryBoost {
    pub fn new(prefix: impl Into<String>, boost: f32) -> Self {
        Self {
            prefix: prefix.into(),
            boost,
        }
    }
}

impl std::str::FromStr for CategoryBoost {
    type Err = ConfigError;

    /// Parses `prefix=boost`, e.g. `guides=0.5`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, boost) = s
            .split_once('=')
            .ok_or_else(|| ConfigError::Invalid(format!("boost must be prefix=value, got '{}'", s)))?;
        let boost: f32 = boost
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("boost value is not a number: '{}'", boost)))?;
        Ok(Self::new(prefix.trim(), boost))
    }
}

/// Context discovery and selection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    /// Roots scanned in order
    pub roots: Vec<ContextRoot>,

    /// File extensions treated as context documents
    pub extensions: Vec<String>,

    /// Default token budget for selection
    pub max_tokens: usize,

    /// Chunks scoring below this are dropped
    pub min_score: f32,

    /// Keep at most this many chunks before budget packing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_n: Option<usize>,

    /// Category boosts, first matching prefix wins
    pub boosts: Vec<CategoryBoost>,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            roots: vec![
                ContextRoot::new("docs", "docs"),
                ContextRoot::new("knowledge", "knowledge"),
                ContextRoot::new("prompts", "prompts"),
            ],
            extensions: vec!["md".to_string(), "txt".to_string()],
            max_tokens: 8000,
            min_score: 0.1,
            top_n: None,
            boosts: Vec::new(),
        }
    }
}

/// Which store backs the cache manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    File,
    Redis,
}

impl std::str::FromStr for CacheBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" | "disk" | "json" => Ok(Self::File),
            "redis" => Ok(Self::Redis),
            other => Err(ConfigError::Invalid(format!("unknown cache backend '{}'", other))),
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Directory holding cache.json, the embedding files and the usage log
    pub dir: PathBuf,

    /// Backend used by the cache manager
    pub backend: CacheBackendKind,

    /// Redis connection URL (redis backend only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,

    /// TTL applied when callers don't pass one; 0 means no expiry
    pub default_ttl_secs: u64,

    /// Keys longer than this are replaced by their SHA-256
    pub key_hash_threshold: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            backend: CacheBackendKind::File,
            redis_url: None,
            default_ttl_secs: 3600,
            key_hash_threshold: 200,
        }
    }
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Option<std::time::Duration> {
        (self.default_ttl_secs > 0).then(|| std::time::Duration::from_secs(self.default_ttl_secs))
    }
}

/// Embedding backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Use embeddings when the backend is reachable
    pub enabled: bool,

    /// Ollama server URL
    pub url: String,

    /// Embedding model name
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Embeddings older than this are pruned by `embeddings prune`
    pub max_age_days: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            timeout_secs: 10,
            max_age_days: 30,
        }
    }
}

/// Dynamic context settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicSettings {
    /// Append git/filesystem signals to selections
    pub enabled: bool,

    /// Timeout for each external command
    pub command_timeout_secs: u64,

    /// Number of recent commits to include
    pub recent_commits: usize,

    /// Number of recently modified files from the context roots to include
    pub recent_files: usize,
}

impl Default for DynamicSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            command_timeout_secs: 5,
            recent_commits: 5,
            recent_files: 10,
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("context-kit")
}

impl Config {
    /// Get default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("context-kit")
            .join("config.toml")
    }

    /// Load config from default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path())
    }

    /// Load config from specific path
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default().with_env_overrides());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;

        Ok(config.with_env_overrides())
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("CONTEXT_KIT_MODEL") {
            self.tokens.default_model = model;
        }
        if let Ok(dir) = std::env::var("CONTEXT_KIT_CACHE_DIR") {
            self.cache.dir = PathBuf::from(dir);
        }

        // Cache backend
        if let Ok(backend) = std::env::var("CACHE_BACKEND") {
            match backend.parse() {
                Ok(kind) => self.cache.backend = kind,
                Err(e) => tracing::warn!("Ignoring CACHE_BACKEND: {}", e),
            }
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            self.cache.redis_url = Some(url);
        } else if let Ok(host) = std::env::var("REDIS_HOST") {
            let port = std::env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
            self.cache.redis_url = Some(format!("redis://{}:{}", host, port));
        }

        // Embeddings
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            self.embeddings.url = url;
        }
        if let Ok(model) = std::env::var("OLLAMA_EMBED_MODEL") {
            self.embeddings.model = model;
        }

        self
    }

    /// Save config to specific path
    pub fn save_to(&self, path: PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.roots.is_empty() {
            return Err(ConfigError::Invalid("context.roots must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.context.min_score) {
            return Err(ConfigError::Invalid(format!(
                "context.min_score must be within 0.0..=1.0, got {}",
                self.context.min_score
            )));
        }
        if let Some(boost) = self.context.boosts.iter().find(|b| b.boost < 0.0) {
            return Err(ConfigError::Invalid(format!(
                "boost for '{}' must not be negative",
                boost.prefix
            )));
        }
        if self.cache.backend == CacheBackendKind::Redis && self.cache.redis_url.is_none() {
            return Err(ConfigError::Invalid(
                "cache.backend = \"redis\" requires cache.redis_url (or REDIS_URL)".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate example config content
    pub fn example() -> String {
        let mut example = Config::default();
        example.context.boosts = vec![CategoryBoost::new("guides", 0.5)];
        toml::to_string_pretty(&example).unwrap_or_default()
    }
}

/// Builder for creating Config programmatically
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.config.tokens.default_model = model.into();
        self
    }

    pub fn root(mut self, path: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        self.config.context.roots.push(ContextRoot::new(path, label));
        self
    }

    pub fn roots(mut self, roots: Vec<ContextRoot>) -> Self {
        self.config.context.roots = roots;
        self
    }

    pub fn boost(mut self, prefix: impl Into<String>, boost: f32) -> Self {
        self.config.context.boosts.push(CategoryBoost::new(prefix, boost));
        self
    }

    pub fn max_tokens(mut self, tokens: usize) -> Self {
        self.config.context.max_tokens = tokens;
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache.dir = dir.into();
        self
    }

    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.cache.backend = CacheBackendKind::Redis;
        self.config.cache.redis_url = Some(url.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tokens.default_model, "claude-sonnet-4-20250514");
        assert_eq!(config.cache.backend, CacheBackendKind::File);
        assert_eq!(config.context.min_score, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .default_model("gpt-4o")
            .roots(vec![ContextRoot::new("notes", "notes")])
            .boost("guides", 0.5)
            .max_tokens(2000)
            .build();

        assert_eq!(config.tokens.default_model, "gpt-4o");
        assert_eq!(config.context.roots.len(), 1);
        assert_eq!(config.context.boosts[0], CategoryBoost::new("guides", 0.5));
        assert_eq!(config.context.max_tokens, 2000);
    }

    #[test]
    fn test_example_config_round_trips() {
        let example = Config::example();
        assert!(example.contains("[tokens]"));
        assert!(example.contains("[cache]"));

        let parsed: Config = toml::from_str(&example).unwrap();
        assert_eq!(parsed.context.boosts.len(), 1);
        assert_eq!(parsed.context.roots, Config::default().context.roots);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = toml::from_str("[cache]\nbackend = \"redis\"\n").unwrap();
        assert_eq!(parsed.cache.backend, CacheBackendKind::Redis);
        assert_eq!(parsed.cache.key_hash_threshold, 200);
        // redis without a URL is rejected
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn test_boost_parsing() {
        let boost: CategoryBoost = "guides = 0.25".parse().unwrap();
        assert_eq!(boost, CategoryBoost::new("guides", 0.25));
        assert!("guides".parse::<CategoryBoost>().is_err());
        assert!("guides=lots".parse::<CategoryBoost>().is_err());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.context.max_tokens, 8000);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = ConfigBuilder::new().max_tokens(1234).build();
        config.save_to(path.clone()).unwrap();

        let loaded = Config::load_from(path).unwrap();
        assert_eq!(loaded.context.max_tokens, 1234);
    }
}
