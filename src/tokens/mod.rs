//! Token counting, model limits, and cost estimation
//!
//! Counts are exact for OpenAI model families (via `tiktoken-rs`) and a blended word/character
//! heuristic for everything else. Unknown models never fail: they fall back to
//! [`FALLBACK_CONTEXT_LIMIT`] and zero cost, with a warning.

pub mod models;
mod truncate;

pub use models::{Encoding, ModelInfo, MODELS};
pub use truncate::TruncateFrom;

use serde::Serialize;
use std::cell::OnceCell;
use tiktoken_rs::CoreBPE;
use tracing::warn;

/// Context window assumed for models missing from the limit table
pub const FALLBACK_CONTEXT_LIMIT: usize = 8_192;

/// Result of checking a token count against a model's context window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LimitCheck {
    pub within_limit: bool,
    /// `context_limit - (tokens + reserved_output)`; negative when over
    pub remaining: i64,
    pub context_limit: usize,
}

/// Outcome of [`TokenEstimator::validate_before_send`]
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub model: String,
    pub prompt_tokens: usize,
    pub max_output_tokens: usize,
    pub total_tokens: usize,
    pub context_limit: usize,
    pub remaining: i64,
    pub within_limit: bool,
    pub estimated_cost: f64,
    pub truncated: bool,
    /// Prompt size before truncation (equal to `prompt_tokens` when not truncated)
    pub original_prompt_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated_prompt: Option<String>,
}

/// Token estimator for a set of known models
#[derive(Debug, Clone)]
pub struct TokenEstimator {
    default_model: String,
    fallback_limit: usize,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new("claude-sonnet-4-20250514")
    }
}

impl TokenEstimator {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            default_model: default_model.into(),
            fallback_limit: FALLBACK_CONTEXT_LIMIT,
        }
    }

    pub fn from_settings(settings: &crate::config::TokenSettings) -> Self {
        Self::new(settings.default_model.clone()).with_fallback_limit(settings.fallback_context_limit)
    }

    pub fn with_fallback_limit(mut self, limit: usize) -> Self {
        self.fallback_limit = limit;
        self
    }

    /// Model used by [`crate::context::ContextChunk`] counts and CLI defaults
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Count tokens in `text` for `model`.
    ///
    /// Heuristic counts never decrease as text is appended. Exact BPE counts only guarantee that at
    /// word boundaries: a partial word can merge into fewer tokens once it is completed.
    pub fn count_tokens(&self, text: &str, model: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let encoding = models::lookup(model)
            .map(|m| m.encoding)
            .unwrap_or(Encoding::Heuristic);

        exact_count(encoding, text).unwrap_or_else(|| heuristic_count(text))
    }

    /// Count tokens with the default model
    pub fn count(&self, text: &str) -> usize {
        self.count_tokens(text, &self.default_model)
    }

    /// Context window for `model`, or the fallback limit with a warning
    pub fn context_limit(&self, model: &str) -> usize {
        match models::lookup(model) {
            Some(info) => info.context_limit,
            None => {
                warn!(
                    "Unknown model '{}', assuming a {} token context window",
                    model, self.fallback_limit
                );
                self.fallback_limit
            }
        }
    }

    /// Estimated USD cost, rounded to six decimals; 0.0 for unknown models
    pub fn estimate_cost(&self, input_tokens: usize, output_tokens: usize, model: &str) -> f64 {
        let Some(info) = models::lookup(model) else {
            warn!("No pricing for model '{}', reporting zero cost", model);
            return 0.0;
        };

        let cost = (input_tokens as f64 / 1_000_000.0) * info.input_price
            + (output_tokens as f64 / 1_000_000.0) * info.output_price;
        (cost * 1_000_000.0).round() / 1_000_000.0
    }

    /// Check `token_count` plus reserved output against the model's context window
    pub fn check_limits(&self, token_count: usize, model: &str, reserved_output_tokens: usize) -> LimitCheck {
        let context_limit = self.context_limit(model);
        let remaining = context_limit as i64 - (token_count as i64 + reserved_output_tokens as i64);
        LimitCheck {
            within_limit: remaining >= 0,
            remaining,
            context_limit,
        }
    }

    /// Count, price and limit-check a prompt in a single pass.
    ///
    /// When the prompt is over the limit and `auto_truncate` is set, the prompt is truncated once to
    /// fit beside `max_output_tokens` and the returned numbers describe the truncated prompt.
    pub fn validate_before_send(
        &self,
        prompt: &str,
        model: &str,
        max_output_tokens: usize,
        auto_truncate: bool,
        truncate_from: TruncateFrom,
    ) -> (bool, ValidationReport) {
        let original_tokens = self.count_tokens(prompt, model);
        let check = self.check_limits(original_tokens, model, max_output_tokens);

        let mut report = ValidationReport {
            model: model.to_string(),
            prompt_tokens: original_tokens,
            max_output_tokens,
            total_tokens: original_tokens + max_output_tokens,
            context_limit: check.context_limit,
            remaining: check.remaining,
            within_limit: check.within_limit,
            estimated_cost: self.estimate_cost(original_tokens, max_output_tokens, model),
            truncated: false,
            original_prompt_tokens: original_tokens,
            truncated_prompt: None,
        };

        if check.within_limit || !auto_truncate {
            return (check.within_limit, report);
        }

        let truncated = self.truncate_to_fit(
            prompt,
            model,
            check.context_limit,
            max_output_tokens,
            truncate_from,
        );
        let tokens = self.count_tokens(&truncated, model);
        let check = self.check_limits(tokens, model, max_output_tokens);

        report.prompt_tokens = tokens;
        report.total_tokens = tokens + max_output_tokens;
        report.remaining = check.remaining;
        report.within_limit = check.within_limit;
        report.estimated_cost = self.estimate_cost(tokens, max_output_tokens, model);
        report.truncated = true;
        report.truncated_prompt = Some(truncated);

        (check.within_limit, report)
    }
}

/// `floor(0.6 * words * 0.75 + 0.4 * chars / 4)`
fn heuristic_count(text: &str) -> usize {
    let words = text.split_whitespace().count() as f64;
    let chars = text.chars().count() as f64;
    (0.6 * (words * 0.75) + 0.4 * (chars / 4.0)).floor() as usize
}

thread_local! {
    static O200K: OnceCell<Option<CoreBPE>> = OnceCell::new();
    static CL100K: OnceCell<Option<CoreBPE>> = OnceCell::new();
}

/// Exact BPE count, or `None` when the model has no tokenizer or it failed to load
fn exact_count(encoding: Encoding, text: &str) -> Option<usize> {
    let count = |cell: &OnceCell<Option<CoreBPE>>, name: &str, build: fn() -> anyhow::Result<CoreBPE>| {
        cell.get_or_init(|| load_bpe(name, build))
            .as_ref()
            .map(|bpe| bpe.encode_with_special_tokens(text).len())
    };

    match encoding {
        Encoding::O200kBase => O200K.with(|cell| count(cell, "o200k_base", tiktoken_rs::o200k_base)),
        Encoding::Cl100kBase => CL100K.with(|cell| count(cell, "cl100k_base", tiktoken_rs::cl100k_base)),
        Encoding::Heuristic => None,
    }
}

fn load_bpe(name: &str, build: fn() -> anyhow::Result<CoreBPE>) -> Option<CoreBPE> {
    match build() {
        Ok(bpe) => Some(bpe),
        Err(e) => {
            warn!("Failed to load {} tokenizer, using heuristic counts: {}", name, e);
            None
        }
    }
}
