//! context-kit - Token-budgeted context selection for LLM prompts
//!
//! This library picks the documents most relevant to a task and packs them into a token budget,
//! estimates tokens and cost against known model limits, and caches expensive work.
//!
//! ## Key Features
//!
//! - **Context Selection**: Score documents against a task (embeddings or keyword overlap), then
//!   pack greedily into a budget, compressing the first document that does not fit
//! - **Token Estimation**: Exact counts for OpenAI models, a calibrated heuristic elsewhere, with
//!   context-limit checks, truncation and cost estimates
//! - **Caching**: TTL cache on disk or in Redis with hit/miss statistics and memoization, plus a
//!   content-addressed embedding cache
//! - **Usage Tracking**: Append-only log of model usage with cost summaries

pub mod cache;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod metrics;
pub mod scoring;
pub mod tokens;
pub mod ui;

pub use cache::{CacheBackend, CacheEntry, CacheError, CacheManager, CacheStats, MemoKey};
pub use config::{Config, ConfigBuilder, ConfigError};
pub use context::{
    discover_context_files, format_report, score_relevance, ContextChunk, ContextSelector, DynamicContext,
    ReportOptions, Selection, SelectionStats,
};
pub use embeddings::{Embedder, EmbeddingCache, EmbeddingError, OllamaEmbedder};
pub use metrics::{UsageLog, UsageRecord, UsageSummary, UsageTracker};
pub use scoring::{KeywordScorer, Scorer, SemanticScorer};
pub use tokens::{TokenEstimator, TruncateFrom, ValidationReport};
