//! Text embeddings for semantic scoring
//!
//! An [`Embedder`] turns text into a vector; [`EmbeddingCache`] remembers vectors on disk keyed by
//! a hash of the text so repeated scoring runs skip the backend entirely.

mod cache;
mod ollama;

pub use cache::{EmbeddingCache, EmbeddingMeta};
pub use ollama::{OllamaEmbedder, OllamaEmbedderConfig};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to connect to embedding backend: {0}")]
    Connection(String),

    #[error("Embedding backend error: {0}")]
    Backend(String),

    #[error("Embedding cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Embedding cache encoding error: {0}")]
    Encoding(String),
}

/// Source of embedding vectors
pub trait Embedder: Send + Sync {
    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Backend/model name for logging
    fn name(&self) -> &str;
}

/// Cosine similarity; 0.0 for mismatched or zero-length vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
