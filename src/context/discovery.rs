//! Loading candidate context documents from disk

use super::ContextChunk;
use crate::config::ContextRoot;
use crate::tokens::TokenEstimator;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Walk every root and build one chunk per readable document.
///
/// Files are visited in path order so discovery order is stable between runs. Unreadable files
/// are skipped with a warning; missing roots are skipped silently.
pub fn discover_context_files(
    roots: &[ContextRoot],
    extensions: &[String],
    tokens: &TokenEstimator,
) -> Vec<ContextChunk> {
    let mut chunks = Vec::new();

    for root in roots {
        if !root.path.is_dir() {
            debug!("Context root {} does not exist, skipping", root.path.display());
            continue;
        }

        let walker = WalkDir::new(&root.path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable path under {}: {}", root.path.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
                continue;
            }

            match load_chunk(root, entry.path(), tokens) {
                Ok(chunk) => chunks.push(chunk),
                Err(e) => warn!("Skipping {}: {}", entry.path().display(), e),
            }
        }
    }

    debug!("Discovered {} context documents", chunks.len());
    chunks
}

fn load_chunk(root: &ContextRoot, path: &Path, tokens: &TokenEstimator) -> std::io::Result<ContextChunk> {
    let content = std::fs::read_to_string(path)?;
    let category = category_for(root, path);

    let mut chunk = ContextChunk::new(path.display().to_string(), content, category, tokens)
        .with_metadata("root", root.label.clone());

    if let Some(title) = extract_title(chunk.content()) {
        chunk = chunk.with_metadata("title", title);
    }
    if let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) {
        chunk = chunk.with_metadata("modified", DateTime::<Utc>::from(modified).to_rfc3339());
    }

    Ok(chunk)
}

/// First directory below the root, or the root's label for top-level files
fn category_for(root: &ContextRoot, path: &Path) -> String {
    let Ok(relative) = path.strip_prefix(&root.path) else {
        return root.label.clone();
    };

    let mut components = relative.components();
    match (components.next(), components.next()) {
        (Some(first), Some(_)) => first.as_os_str().to_string_lossy().into_owned(),
        _ => root.label.clone(),
    }
}

/// Text of the first top-level `# ` heading
pub fn extract_title(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

pub(super) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn exts() -> Vec<String> {
        vec!["md".to_string(), "txt".to_string()]
    }

    #[test]
    fn test_discovers_with_categories_and_titles() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        write(&docs.join("overview.md"), "# Overview\nTop level file.");
        write(&docs.join("guides/caching.md"), "intro\n# Caching Guide\nTTL notes.");
        write(&docs.join("guides/deep/more.txt"), "no heading here");
        write(&docs.join("ignored.rs"), "fn main() {}");
        write(&docs.join(".hidden/secret.md"), "# Secret");

        let roots = vec![ContextRoot::new(&docs, "docs")];
        let chunks = discover_context_files(&roots, &exts(), &TokenEstimator::default());

        let sources: Vec<_> = chunks.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(sources, vec!["guides", "guides", "docs"]);

        let caching = chunks.iter().find(|c| c.source.ends_with("caching.md")).unwrap();
        assert_eq!(caching.title(), Some("Caching Guide"));
        assert!(caching.token_count() > 0);
        assert!(caching.metadata.contains_key("modified"));
        assert_eq!(caching.metadata.get("root").map(String::as_str), Some("docs"));

        let more = chunks.iter().find(|c| c.source.ends_with("more.txt")).unwrap();
        assert_eq!(more.title(), None);
    }

    #[test]
    fn test_order_is_stable_across_roots() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("a/z.md"), "z");
        write(&dir.path().join("a/b.md"), "b");
        write(&dir.path().join("k/a.md"), "a");

        let roots = vec![
            ContextRoot::new(dir.path().join("k"), "k"),
            ContextRoot::new(dir.path().join("a"), "a"),
        ];
        let chunks = discover_context_files(&roots, &exts(), &TokenEstimator::default());
        let contents: Vec<_> = chunks.iter().map(|c| c.content()).collect();
        assert_eq!(contents, vec!["a", "b", "z"]);
    }

    #[test]
    fn test_missing_root_and_invalid_utf8_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("binary.md"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        write(&docs.join("good.md"), "fine");

        let roots = vec![
            ContextRoot::new(dir.path().join("nope"), "nope"),
            ContextRoot::new(&docs, "docs"),
        ];
        let chunks = discover_context_files(&roots, &exts(), &TokenEstimator::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content(), "fine");
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(extract_title("## Sub\n# Main \nbody"), Some("Main".to_string()));
        assert_eq!(extract_title("no heading"), None);
        assert_eq!(extract_title("#  \n"), None);
    }
}
