//! Budget-driven truncation and summarization

use super::TokenEstimator;
use serde::{Deserialize, Serialize};

const MIDDLE_MARKER: &str = "\n\n[... content truncated ...]\n\n";

/// Shrink factor applied per truncation step
const BACKOFF: f64 = 0.95;

/// Which part of the text is removed when truncating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncateFrom {
    /// Drop the beginning, keep the tail
    Start,
    /// Drop the end, keep the head
    #[default]
    End,
    /// Keep head and tail, drop the middle
    Middle,
}

impl std::str::FromStr for TruncateFrom {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "end" => Ok(Self::End),
            "middle" => Ok(Self::Middle),
            other => Err(format!("expected start, end or middle, got '{}'", other)),
        }
    }
}

impl std::fmt::Display for TruncateFrom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Middle => "middle",
        };
        f.write_str(name)
    }
}

fn cut(chars: &[char], keep: usize, from: TruncateFrom) -> String {
    match from {
        TruncateFrom::End => chars[..keep].iter().collect(),
        TruncateFrom::Start => chars[chars.len() - keep..].iter().collect(),
        TruncateFrom::Middle => {
            let head = keep.div_ceil(2);
            let tail = keep - head;
            let mut out: String = chars[..head].iter().collect();
            out.push_str(MIDDLE_MARKER);
            out.extend(&chars[chars.len() - tail..]);
            out
        }
    }
}

fn is_structural(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
        return true;
    }
    if trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("+ ") {
        return true;
    }
    // numbered list item: "12. text" or "3) text"
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && matches!(trimmed[digits..].chars().next(), Some('.') | Some(')'))
}

impl TokenEstimator {
    /// Shrink `text` until it fits in `max_tokens - reserved_output_tokens`.
    ///
    /// Text already within budget is returned unchanged. Otherwise the kept length starts at a
    /// proportional guess and backs off by ~5% per step until the count fits; the result always
    /// satisfies the budget and is empty when the budget is zero.
    pub fn truncate_to_fit(
        &self,
        text: &str,
        model: &str,
        max_tokens: usize,
        reserved_output_tokens: usize,
        from: TruncateFrom,
    ) -> String {
        let budget = max_tokens.saturating_sub(reserved_output_tokens);
        if budget == 0 {
            return String::new();
        }

        let total = self.count_tokens(text, model);
        if total <= budget {
            return text.to_string();
        }

        let chars: Vec<char> = text.chars().collect();
        let guess = (chars.len() as f64 * budget as f64 / total as f64) as usize;
        let mut keep = guess.min(chars.len().saturating_sub(1));

        while keep > 0 {
            let candidate = cut(&chars, keep, from);
            if self.count_tokens(&candidate, model) <= budget {
                return candidate;
            }
            keep = ((keep as f64 * BACKOFF) as usize).min(keep - 1);
        }

        String::new()
    }

    /// Fit `text` into `max_tokens` by dropping prose before structure.
    ///
    /// Headers, list items and code fences are kept in preference to ordinary lines; prose is
    /// dropped from the end first. A note with the approximate share removed is appended. Falls
    /// back to [`TokenEstimator::truncate_to_fit`] when structure alone is still too large.
    pub fn summarize_to_fit(&self, text: &str, model: &str, max_tokens: usize) -> String {
        if max_tokens == 0 {
            return String::new();
        }
        if self.count_tokens(text, model) <= max_tokens {
            return text.to_string();
        }

        let lines: Vec<&str> = text.lines().collect();
        let mut keep = vec![true; lines.len()];
        let line_tokens: Vec<usize> = lines.iter().map(|l| self.count_tokens(l, model) + 1).collect();
        let mut estimate: usize = line_tokens.iter().sum();

        // A rough note size keeps the line estimate honest; the exact check happens below.
        let note_reserve = self.count_tokens(&summary_note(100), model) + 1;
        let target = max_tokens.saturating_sub(note_reserve);

        for structural_pass in [false, true] {
            for idx in (0..lines.len()).rev() {
                if estimate <= target {
                    break;
                }
                if keep[idx] && is_structural(lines[idx]) == structural_pass {
                    keep[idx] = false;
                    estimate -= line_tokens[idx];
                }
            }
        }

        let kept: Vec<&str> = lines
            .iter()
            .zip(&keep)
            .filter_map(|(line, kept)| kept.then_some(*line))
            .collect();
        let body = kept.join("\n");

        let total_chars = text.chars().count().max(1);
        let removed_pct = ((total_chars - body.chars().count().min(total_chars)) * 100) / total_chars;

        let summarized = format!("{}{}", body, summary_note(removed_pct));
        if self.count_tokens(&summarized, model) <= max_tokens {
            return summarized;
        }

        let room = max_tokens.saturating_sub(self.count_tokens(&summary_note(removed_pct), model));
        let trimmed = self.truncate_to_fit(&body, model, room, 0, TruncateFrom::End);
        let with_note = format!("{}{}", trimmed, summary_note(removed_pct));
        if self.count_tokens(&with_note, model) <= max_tokens {
            with_note
        } else {
            self.truncate_to_fit(text, model, max_tokens, 0, TruncateFrom::End)
        }
    }
}

fn summary_note(removed_pct: usize) -> String {
    format!(
        "\n\n[Summarized to fit token budget: ~{}% of content removed]",
        removed_pct
    )
}
