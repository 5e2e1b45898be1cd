//! Plain-text report of a selection

use super::{DynamicContext, Selection};

/// Which annotations to add per chunk
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub show_scores: bool,
    pub show_tokens: bool,
}

/// Render dynamic context followed by every selected chunk
pub fn format_report(selection: &Selection, dynamic: Option<&DynamicContext>, options: ReportOptions) -> String {
    let mut out = String::new();

    if let Some(dynamic) = dynamic {
        out.push_str(&dynamic.render());
        out.push('\n');
    }

    let stats = &selection.stats;
    out.push_str(&format!("## Selected Context ({} of {} documents", stats.selected, stats.candidates));
    if options.show_tokens {
        out.push_str(&format!(", {}/{} tokens", stats.tokens_used, stats.budget));
    }
    out.push_str(")\n");

    if selection.chunks.is_empty() {
        out.push_str("\nNo context met the relevance threshold.\n");
        return out;
    }

    for chunk in &selection.chunks {
        out.push_str(&format!("\n### {}\n", chunk.title().unwrap_or(&chunk.source)));

        let mut details = vec![format!("Source: {}", chunk.source), format!("Category: {}", chunk.category)];
        if options.show_scores {
            details.push(format!("Score: {:.2}", chunk.relevance_score));
        }
        if options.show_tokens {
            details.push(format!("Tokens: {}", chunk.token_count()));
        }
        out.push_str(&details.join(" | "));
        out.push('\n');

        if let Some(summary) = &chunk.summary {
            out.push_str(&format!("_{}_\n", summary));
        }

        out.push('\n');
        out.push_str(chunk.content().trim_end());
        out.push('\n');
    }

    out
}
