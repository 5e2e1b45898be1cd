//! Relevance scoring and token-budgeted selection

use super::ContextChunk;
use crate::config::CategoryBoost;
use crate::scoring::Scorer;
use crate::tokens::{TokenEstimator, TruncateFrom};
use serde::Serialize;
use tracing::debug;

const TRUNCATION_MARKER: &str = "\n\n[... truncated to fit context budget]";

/// Score every chunk against `task`, applying the first matching category boost.
///
/// Boosted scores are multiplied by `1 + boost` and capped at 1.0.
pub fn score_relevance(task: &str, chunks: &mut [ContextChunk], scorer: &dyn Scorer, boosts: &[CategoryBoost]) {
    for chunk in chunks.iter_mut() {
        let mut score = scorer.score_similarity(task, chunk.content());

        if let Some(boost) = boosts.iter().find(|b| chunk.category.starts_with(&b.prefix)) {
            score = (score * (1.0 + boost.boost)).min(1.0);
        }

        chunk.relevance_score = score;
    }
}

/// Summary of one selection run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionStats {
    pub candidates: usize,
    /// Chunks at or above `min_score`
    pub eligible: usize,
    pub selected: usize,
    pub compressed: usize,
    pub tokens_used: usize,
    pub budget: usize,
}

impl SelectionStats {
    pub fn utilization(&self) -> f32 {
        if self.budget == 0 {
            return 0.0;
        }
        self.tokens_used as f32 / self.budget as f32
    }
}

/// Selected chunks plus stats
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    pub chunks: Vec<ContextChunk>,
    pub stats: SelectionStats,
}

/// Greedy, budget-bounded context selection
pub struct ContextSelector<'a> {
    tokens: &'a TokenEstimator,
}

impl<'a> ContextSelector<'a> {
    pub fn new(tokens: &'a TokenEstimator) -> Self {
        Self { tokens }
    }

    /// Pick chunks by descending score until `max_tokens` is reached.
    ///
    /// The first chunk that would overflow is compressed into the remaining budget and appended
    /// if anything survives; selection stops there either way, so smaller later chunks are never
    /// considered.
    pub fn select_context(
        &self,
        chunks: &[ContextChunk],
        max_tokens: usize,
        top_n: Option<usize>,
        min_score: f32,
    ) -> Vec<ContextChunk> {
        let mut ranked: Vec<&ContextChunk> = chunks
            .iter()
            .filter(|c| c.relevance_score >= min_score)
            .collect();
        // stable: ties keep discovery order
        ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

        if let Some(n) = top_n {
            ranked.truncate(n);
        }

        let mut selected = Vec::new();
        let mut used = 0;

        for chunk in ranked {
            if used + chunk.token_count() <= max_tokens {
                used += chunk.token_count();
                selected.push(chunk.clone());
                continue;
            }

            if let Some(compressed) = self.compress_context(chunk, max_tokens - used) {
                if compressed.token_count() > 0 {
                    debug!(
                        "Compressed {} from {} to {} tokens",
                        chunk.source,
                        chunk.token_count(),
                        compressed.token_count()
                    );
                    selected.push(compressed);
                }
            }
            break;
        }

        selected
    }

    /// [`ContextSelector::select_context`] with stats for reporting
    pub fn select(
        &self,
        chunks: &[ContextChunk],
        max_tokens: usize,
        top_n: Option<usize>,
        min_score: f32,
    ) -> Selection {
        let selected = self.select_context(chunks, max_tokens, top_n, min_score);
        let stats = SelectionStats {
            candidates: chunks.len(),
            eligible: chunks.iter().filter(|c| c.relevance_score >= min_score).count(),
            selected: selected.len(),
            compressed: selected.iter().filter(|c| c.is_compressed()).count(),
            tokens_used: selected.iter().map(ContextChunk::token_count).sum(),
            budget: max_tokens,
        };
        Selection {
            chunks: selected,
            stats,
        }
    }

    /// Shrink a chunk to at most `max_tokens`, or `None` when there is no budget.
    ///
    /// Keeps headings and the first line after each heading, drops fenced code and other prose,
    /// then truncates with a marker if the outline is still too large. Text without headings is
    /// truncated directly.
    pub fn compress_context(&self, chunk: &ContextChunk, max_tokens: usize) -> Option<ContextChunk> {
        if max_tokens == 0 {
            return None;
        }

        let outline = outline(chunk.content());
        let base = if outline.trim().is_empty() {
            chunk.content()
        } else {
            outline.as_str()
        };

        let content = if self.tokens.count(base) <= max_tokens {
            base.to_string()
        } else {
            self.truncate_with_marker(base, max_tokens)
        };

        let mut compressed = chunk.with_content(content, self.tokens);
        compressed.summary = Some(format!(
            "Compressed from {} to {} tokens",
            chunk.token_count(),
            compressed.token_count()
        ));
        Some(compressed)
    }

    fn truncate_with_marker(&self, text: &str, max_tokens: usize) -> String {
        let model = self.tokens.default_model();
        let marker_tokens = self.tokens.count(TRUNCATION_MARKER);

        // +1: counts of joined text can exceed the sum of the parts by one
        if marker_tokens + 1 < max_tokens {
            let body = self
                .tokens
                .truncate_to_fit(text, model, max_tokens - marker_tokens - 1, 0, TruncateFrom::End);
            if !body.is_empty() {
                let marked = format!("{}{}", body, TRUNCATION_MARKER);
                if self.tokens.count(&marked) <= max_tokens {
                    return marked;
                }
            }
        }

        self.tokens
            .truncate_to_fit(text, model, max_tokens, 0, TruncateFrom::End)
    }
}

/// Headings plus the first non-blank line after each, outside code fences
fn outline(content: &str) -> String {
    let mut kept = Vec::new();
    let mut in_code = false;
    let mut after_heading = false;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_code = !in_code;
            continue;
        }
        if in_code {
            continue;
        }
        if trimmed.starts_with('#') {
            kept.push(line);
            after_heading = true;
        } else if after_heading && !trimmed.is_empty() {
            kept.push(line);
            after_heading = false;
        }
    }

    kept.join("\n")
}
