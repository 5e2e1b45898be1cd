//! Candidate context unit

use crate::tokens::TokenEstimator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A unit of candidate context with its score and token cost.
///
/// `token_count` always matches `content`: content is never edited in place, a changed chunk is a
/// new chunk built with [`ContextChunk::with_content`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextChunk {
    pub source: String,
    content: String,
    pub relevance_score: f32,
    token_count: usize,
    /// Set only when the chunk is a compressed replacement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub category: String,
    /// Title, modification time, root, ...
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl ContextChunk {
    pub fn new(
        source: impl Into<String>,
        content: impl Into<String>,
        category: impl Into<String>,
        tokens: &TokenEstimator,
    ) -> Self {
        let content = content.into();
        Self {
            source: source.into(),
            token_count: tokens.count(&content),
            content,
            relevance_score: 0.0,
            summary: None,
            category: category.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Copy of this chunk with new content and a freshly computed token count
    pub fn with_content(&self, content: impl Into<String>, tokens: &TokenEstimator) -> Self {
        let content = content.into();
        Self {
            source: self.source.clone(),
            token_count: tokens.count(&content),
            content,
            relevance_score: self.relevance_score,
            summary: None,
            category: self.category.clone(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.relevance_score = score;
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.get("title").map(String::as_str)
    }

    pub fn is_compressed(&self) -> bool {
        self.summary.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_count_computed_on_construction() {
        let tokens = TokenEstimator::default();
        let chunk = ContextChunk::new("a.md", "some words for counting here", "docs", &tokens);
        assert_eq!(chunk.token_count(), tokens.count("some words for counting here"));
        assert_eq!(chunk.relevance_score, 0.0);
        assert!(!chunk.is_compressed());
    }

    #[test]
    fn test_with_content_recounts_and_keeps_identity() {
        let tokens = TokenEstimator::default();
        let chunk = ContextChunk::new("a.md", "one two three four five six seven", "docs", &tokens)
            .with_score(0.7)
            .with_metadata("title", "A");

        let smaller = chunk.with_content("one two", &tokens);
        assert_eq!(smaller.token_count(), tokens.count("one two"));
        assert!(smaller.token_count() < chunk.token_count());
        assert_eq!(smaller.source, "a.md");
        assert_eq!(smaller.relevance_score, 0.7);
        assert_eq!(smaller.title(), Some("A"));
        // original untouched
        assert_eq!(chunk.content(), "one two three four five six seven");
    }

    #[test]
    fn test_serializes_counts() {
        let tokens = TokenEstimator::default();
        let chunk = ContextChunk::new("a.md", "hello there friend", "docs", &tokens);
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["token_count"], chunk.token_count());
        assert!(json.get("summary").is_none());
    }
}
