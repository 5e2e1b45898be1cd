//! Keyword-overlap similarity

use super::Scorer;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\p{Alphabetic}\p{N}]+").expect("static regex"))
}

/// Lowercased alphanumeric words longer than three characters
fn keywords(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    word_pattern()
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| w.chars().count() > 3)
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of the two texts' keyword sets; 0.0 if either is empty
pub fn keyword_similarity(text1: &str, text2: &str) -> f32 {
    let a = keywords(text1);
    let b = keywords(text2);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    intersection as f32 / union as f32
}

/// Scorer used when no embedding backend is available
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordScorer;

impl Scorer for KeywordScorer {
    fn score_similarity(&self, text1: &str, text2: &str) -> f32 {
        keyword_similarity(text1, text2)
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_short_words_ignored() {
        assert_eq!(keywords("the cat sat on a mat"), HashSet::new());
        assert_eq!(keyword_similarity("the cat", "the cat"), 0.0);
    }

    #[test]
    fn test_case_and_punctuation() {
        let set = keywords("Token-Budget, TOKEN budget!");
        assert_eq!(set.len(), 2);
        assert!(set.contains("token"));
        assert!(set.contains("budget"));
    }

    #[test]
    fn test_partial_overlap() {
        // {cache, eviction, policy} vs {cache, policy, design}: 2 / 4
        let score = keyword_similarity("cache eviction policy", "cache policy design");
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_non_ascii_words() {
        let set = keywords("café résumé naïve Größenordnung");
        assert_eq!(set.len(), 4);
        assert!(set.contains("café"));
        assert!(set.contains("größenordnung"));

        assert_eq!(keyword_similarity("café résumé", "café résumé"), 1.0);
        assert_eq!(keyword_similarity("缓存策略设计 токенов", "токенов"), 0.5);
        // four characters but more than four bytes
        assert!(keywords("naïf").contains("naïf"));
        assert!(keywords("été").is_empty());
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(keyword_similarity("", "anything here"), 0.0);
        assert_eq!(keyword_similarity("anything here", ""), 0.0);
    }

    proptest! {
        #[test]
        fn prop_self_similarity_is_one(text in "[a-z]{4,10}( [a-z]{1,10}){0,10}") {
            prop_assert_eq!(keyword_similarity(&text, &text), 1.0);
        }

        #[test]
        fn prop_self_similarity_is_one_unicode(text in "[à-öø-ÿα-ωа-я]{4,10}( [a-zà-öø-ÿα-ωа-я]{1,10}){0,10}") {
            prop_assert_eq!(keyword_similarity(&text, &text), 1.0);
        }

        #[test]
        fn prop_symmetric(a in "[a-z ]{0,80}", b in "[a-z ]{0,80}") {
            prop_assert_eq!(keyword_similarity(&a, &b), keyword_similarity(&b, &a));
        }

        #[test]
        fn prop_in_unit_range(a in "[a-zA-Z0-9 ]{0,80}", b in "[a-zA-Z0-9 ]{0,80}") {
            let s = keyword_similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&s));
        }
    }
}
