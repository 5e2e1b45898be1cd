//! Embedding backend using a local Ollama server

use super::{Embedder, EmbeddingError};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::warn;

/// Configuration for the Ollama embedder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaEmbedderConfig {
    /// Ollama server URL
    pub ollama_url: String,
    /// Embedding model (e.g., "nomic-embed-text", "mxbai-embed-large")
    pub model: String,
    pub timeout: Duration,
}

impl Default for OllamaEmbedderConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl From<&crate::config::EmbeddingSettings> for OllamaEmbedderConfig {
    fn from(settings: &crate::config::EmbeddingSettings) -> Self {
        Self {
            ollama_url: settings.url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embedder backed by Ollama's `/api/embeddings` endpoint
pub struct OllamaEmbedder {
    config: OllamaEmbedderConfig,
    client: Client,
}

impl OllamaEmbedder {
    pub fn new(config: OllamaEmbedderConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbeddingError::Connection(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Client for `settings` when the server answers with the model; otherwise `None`, with a warning
    pub fn from_settings(settings: &crate::config::EmbeddingSettings) -> Option<Self> {
        let embedder = match Self::new(OllamaEmbedderConfig::from(settings)) {
            Ok(embedder) => embedder,
            Err(e) => {
                warn!("Could not build embedding client: {}", e);
                return None;
            }
        };

        if embedder.is_available() {
            Some(embedder)
        } else {
            warn!("Embedding model {} not available at {}", settings.model, settings.url);
            None
        }
    }

    /// Check that the server answers and lists the configured model
    pub fn is_available(&self) -> bool {
        let response = match self
            .client
            .get(format!("{}/api/tags", self.config.ollama_url))
            .send()
        {
            Ok(r) if r.status().is_success() => r,
            _ => return false,
        };

        let Ok(json) = response.json::<serde_json::Value>() else {
            return false;
        };

        json["models"]
            .as_array()
            .map(|models| {
                models.iter().any(|m| {
                    m["name"]
                        .as_str()
                        .map(|name| name.split(':').next() == self.config.model.split(':').next())
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let body = json!({
            "model": self.config.model,
            "prompt": text,
        });

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.config.ollama_url))
            .json(&body)
            .send()
            .map_err(|e| EmbeddingError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Backend(format!(
                "Ollama returned status: {}",
                response.status()
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .map_err(|e| EmbeddingError::Backend(e.to_string()))?;

        if parsed.embedding.is_empty() {
            return Err(EmbeddingError::Backend("empty embedding".to_string()));
        }
        Ok(parsed.embedding)
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings_trims_slash() {
        let settings = crate::config::EmbeddingSettings {
            url: "http://example:11434/".to_string(),
            timeout_secs: 3,
            ..Default::default()
        };
        let config = OllamaEmbedderConfig::from(&settings);
        assert_eq!(config.ollama_url, "http://example:11434");
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_unreachable_server_is_unavailable() {
        let config = OllamaEmbedderConfig {
            // port 9 (discard) is essentially never serving HTTP
            ollama_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(200),
            ..Default::default()
        };
        let embedder = OllamaEmbedder::new(config).unwrap();
        assert!(!embedder.is_available());
        assert!(embedder.embed("hello").is_err());
    }

    #[test]
    fn test_from_settings_unreachable_is_none() {
        let settings = crate::config::EmbeddingSettings {
            url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..Default::default()
        };
        assert!(OllamaEmbedder::from_settings(&settings).is_none());
    }
}
