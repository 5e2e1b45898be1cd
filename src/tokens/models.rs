//! Static context-window and pricing tables

use serde::Serialize;

/// Limits and per-million-token prices for one model family
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelInfo {
    /// Table key; matched exactly or as a prefix of the requested model id
    pub id: &'static str,
    pub context_limit: usize,
    /// USD per million input tokens
    pub input_price: f64,
    /// USD per million output tokens
    pub output_price: f64,
    pub encoding: Encoding,
}

/// Tokenizer used for a model family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// gpt-4o and the o-series
    O200kBase,
    /// gpt-4 and gpt-3.5
    Cl100kBase,
    /// No public tokenizer; word/char heuristic
    Heuristic,
}

const fn model(
    id: &'static str,
    context_limit: usize,
    input_price: f64,
    output_price: f64,
    encoding: Encoding,
) -> ModelInfo {
    ModelInfo {
        id,
        context_limit,
        input_price,
        output_price,
        encoding,
    }
}

pub const MODELS: &[ModelInfo] = &[
    // Anthropic
    model("claude-opus-4", 200_000, 15.0, 75.0, Encoding::Heuristic),
    model("claude-sonnet-4", 200_000, 3.0, 15.0, Encoding::Heuristic),
    model("claude-3-7-sonnet", 200_000, 3.0, 15.0, Encoding::Heuristic),
    model("claude-3-5-sonnet", 200_000, 3.0, 15.0, Encoding::Heuristic),
    model("claude-3-5-haiku", 200_000, 0.8, 4.0, Encoding::Heuristic),
    model("claude-3-opus", 200_000, 15.0, 75.0, Encoding::Heuristic),
    model("claude-3-haiku", 200_000, 0.25, 1.25, Encoding::Heuristic),
    // OpenAI
    model("gpt-4o-mini", 128_000, 0.15, 0.6, Encoding::O200kBase),
    model("gpt-4o", 128_000, 2.5, 10.0, Encoding::O200kBase),
    model("gpt-4-turbo", 128_000, 10.0, 30.0, Encoding::Cl100kBase),
    model("gpt-4-32k", 32_768, 60.0, 120.0, Encoding::Cl100kBase),
    model("gpt-4", 8_192, 30.0, 60.0, Encoding::Cl100kBase),
    model("gpt-3.5-turbo", 16_385, 0.5, 1.5, Encoding::Cl100kBase),
    model("o1-mini", 128_000, 3.0, 12.0, Encoding::O200kBase),
    model("o1", 200_000, 15.0, 60.0, Encoding::O200kBase),
    model("o3-mini", 200_000, 1.1, 4.4, Encoding::O200kBase),
    // Google
    model("gemini-1.5-pro", 2_000_000, 1.25, 5.0, Encoding::Heuristic),
    model("gemini-1.5-flash", 1_000_000, 0.075, 0.3, Encoding::Heuristic),
    model("gemini-2.0-flash", 1_000_000, 0.1, 0.4, Encoding::Heuristic),
];

/// Look up a model by exact id, else by the longest table id the model starts with.
///
/// `claude-sonnet-4-20250514` resolves to `claude-sonnet-4`; `gpt-4o-mini-2024-07-18` resolves to
/// `gpt-4o-mini` rather than `gpt-4o` or `gpt-4`.
pub fn lookup(model: &str) -> Option<&'static ModelInfo> {
    let model = model.trim().to_lowercase();
    if let Some(exact) = MODELS.iter().find(|m| m.id == model) {
        return Some(exact);
    }
    MODELS
        .iter()
        .filter(|m| model.starts_with(m.id))
        .max_by_key(|m| m.id.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_prefix_lookup() {
        assert_eq!(lookup("gpt-4").unwrap().context_limit, 8_192);
        assert_eq!(lookup("claude-sonnet-4-20250514").unwrap().id, "claude-sonnet-4");
        assert_eq!(lookup("gpt-4o-mini-2024-07-18").unwrap().id, "gpt-4o-mini");
        assert_eq!(lookup("GPT-4O").unwrap().id, "gpt-4o");
    }

    #[test]
    fn test_unknown_model() {
        assert!(lookup("llama-3.3-70b").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn test_ids_unique() {
        let mut ids: Vec<_> = MODELS.iter().map(|m| m.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), MODELS.len());
    }
}
