//! Semantic similarity scoring
//!
//! [`SemanticScorer`] is picked once at construction: embedding-backed when the embedding server
//! answers, keyword overlap otherwise. Callers only ever see [`Scorer::score_similarity`].

mod keyword;

pub use keyword::{keyword_similarity, KeywordScorer};

use crate::config::EmbeddingSettings;
use crate::embeddings::{cosine_similarity, Embedder, EmbeddingCache, OllamaEmbedder};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Similarity between two texts in `[0, 1]`
pub trait Scorer: Send + Sync {
    fn score_similarity(&self, text1: &str, text2: &str) -> f32;

    /// Short name for reports
    fn name(&self) -> &str;
}

/// Scorer backed by an embedding model with a content-addressed cache
pub struct EmbeddingScorer<E: Embedder> {
    embedder: E,
    cache: Arc<EmbeddingCache>,
    fallback: KeywordScorer,
}

impl<E: Embedder> EmbeddingScorer<E> {
    pub fn new(embedder: E, cache: Arc<EmbeddingCache>) -> Self {
        Self {
            embedder,
            cache,
            fallback: KeywordScorer,
        }
    }

    /// Cached embedding for `text`, computing and storing it on a miss
    pub fn embedding(&self, text: &str, source: &str) -> Option<Vec<f32>> {
        if let Some(hit) = self.cache.get(text) {
            return Some(hit);
        }

        match self.embedder.embed(text) {
            Ok(vector) => {
                self.cache.set(text, vector.clone(), source);
                Some(vector)
            }
            Err(e) => {
                warn!("Embedding with {} failed: {}", self.embedder.name(), e);
                None
            }
        }
    }
}

impl<E: Embedder> Scorer for EmbeddingScorer<E> {
    fn score_similarity(&self, text1: &str, text2: &str) -> f32 {
        match (self.embedding(text1, "query"), self.embedding(text2, "context")) {
            (Some(a), Some(b)) => ((cosine_similarity(&a, &b) + 1.0) / 2.0).clamp(0.0, 1.0),
            _ => self.fallback.score_similarity(text1, text2),
        }
    }

    fn name(&self) -> &str {
        self.embedder.name()
    }
}

/// The scorer variant in use for this process
pub enum SemanticScorer {
    Embedding(EmbeddingScorer<OllamaEmbedder>),
    Keyword(KeywordScorer),
}

impl SemanticScorer {
    /// Use embeddings if enabled and reachable, otherwise keyword overlap
    pub fn from_settings(settings: &EmbeddingSettings, cache: Arc<EmbeddingCache>) -> Self {
        if !settings.enabled {
            debug!("Embeddings disabled, using keyword similarity");
            return Self::Keyword(KeywordScorer);
        }

        match OllamaEmbedder::from_settings(settings) {
            Some(embedder) => {
                info!("Using {} embeddings from {}", settings.model, settings.url);
                Self::Embedding(EmbeddingScorer::new(embedder, cache))
            }
            None => {
                warn!("Using keyword similarity");
                Self::Keyword(KeywordScorer)
            }
        }
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self, Self::Embedding(_))
    }
}

impl Scorer for SemanticScorer {
    fn score_similarity(&self, text1: &str, text2: &str) -> f32 {
        match self {
            Self::Embedding(scorer) => scorer.score_similarity(text1, text2),
            Self::Keyword(scorer) => scorer.score_similarity(text1, text2),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Embedding(scorer) => scorer.name(),
            Self::Keyword(scorer) => scorer.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EmbeddingError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds text as letter frequencies and counts backend calls
    struct CountingEmbedder {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Embedder for CountingEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EmbeddingError::Backend("down".to_string()));
            }
            let mut v = vec![0.0; 26];
            for c in text.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
                v[(c as u8 - b'a') as usize] += 1.0;
            }
            Ok(v)
        }

        fn name(&self) -> &str {
            "letters"
        }
    }

    fn scorer(fail: bool) -> (EmbeddingScorer<CountingEmbedder>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let embedder = CountingEmbedder {
            calls: calls.clone(),
            fail,
        };
        (EmbeddingScorer::new(embedder, Arc::new(EmbeddingCache::in_memory())), calls)
    }

    #[test]
    fn test_identical_text_scores_one() {
        let (scorer, _) = scorer(false);
        let score = scorer.score_similarity("cache eviction", "cache eviction");
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_scores_in_unit_range() {
        let (scorer, _) = scorer(false);
        let score = scorer.score_similarity("abc", "xyz");
        assert!((0.0..=1.0).contains(&score));
        // orthogonal letter sets: cosine 0 maps to 0.5
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_cache_hit_skips_backend() {
        let (scorer, calls) = scorer(false);
        scorer.score_similarity("task text", "chunk text");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        scorer.score_similarity("task text", "chunk text");
        scorer.score_similarity("chunk text", "task text");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_backend_failure_falls_back_to_keywords() {
        let (scorer, _) = scorer(true);
        let text = "selection budget compression";
        assert_eq!(scorer.score_similarity(text, text), 1.0);
        assert_eq!(scorer.score_similarity(text, "unrelated words entirely"), 0.0);
    }

    #[test]
    fn test_disabled_settings_choose_keywords() {
        let settings = EmbeddingSettings {
            enabled: false,
            ..Default::default()
        };
        let scorer = SemanticScorer::from_settings(&settings, Arc::new(EmbeddingCache::in_memory()));
        assert!(!scorer.is_semantic());
        assert_eq!(scorer.name(), "keyword");
    }

    #[test]
    fn test_unreachable_backend_chooses_keywords() {
        let settings = EmbeddingSettings {
            url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..Default::default()
        };
        let scorer = SemanticScorer::from_settings(&settings, Arc::new(EmbeddingCache::in_memory()));
        assert!(!scorer.is_semantic());
    }
}
