//! Ambient signals gathered at selection time: git state, recently modified files and a timestamp

use super::discovery::is_hidden;
use super::ContextChunk;
use crate::config::{ContextRoot, DynamicSettings};
use crate::tokens::TokenEstimator;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::process::Command;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Snapshot of the working environment
#[derive(Debug, Clone, Serialize)]
pub struct DynamicContext {
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub recent_commits: Vec<String>,
    /// `git status --porcelain` lines
    pub changed_files: Vec<String>,
    /// Newest first, from the context roots
    pub recent_files: Vec<String>,
}

impl DynamicContext {
    /// Gather from the current directory
    pub fn gather(settings: &DynamicSettings) -> Self {
        Self::gather_in(None, settings)
    }

    /// Gather from `dir`. Any command that fails or times out just leaves its part empty.
    pub fn gather_in(dir: Option<&Path>, settings: &DynamicSettings) -> Self {
        let mut context = Self {
            generated_at: Utc::now(),
            branch: None,
            recent_commits: Vec::new(),
            changed_files: Vec::new(),
            recent_files: Vec::new(),
        };

        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                warn!("Could not start runtime for dynamic context: {}", e);
                return context;
            }
        };

        let timeout = Duration::from_secs(settings.command_timeout_secs);
        let dir = dir.map(Path::to_path_buf);
        let commits = settings.recent_commits.to_string();
        let log_args = ["log", "--oneline", "-n", commits.as_str()];

        runtime.block_on(async {
            let (branch, log, status) = tokio::join!(
                run_command("git", &["rev-parse", "--abbrev-ref", "HEAD"], dir.as_ref(), timeout),
                run_command("git", &log_args, dir.as_ref(), timeout),
                run_command("git", &["status", "--porcelain"], dir.as_ref(), timeout),
            );

            context.branch = branch.map(|b| b.trim().to_string()).filter(|b| !b.is_empty());
            context.recent_commits = non_empty_lines(log.as_deref());
            context.changed_files = non_empty_lines(status.as_deref());
        });

        context
    }

    /// Add the `limit` most recently modified files under `roots`. Works outside git too.
    pub fn with_recent_files(mut self, roots: &[ContextRoot], limit: usize) -> Self {
        self.recent_files = recent_files(roots, limit);
        self
    }

    pub fn is_git_repo(&self) -> bool {
        self.branch.is_some()
    }

    /// Markdown rendering used in reports and as chunk content
    pub fn render(&self) -> String {
        let mut out = String::from("## Dynamic Context\n");
        out.push_str(&format!("Generated: {}\n", self.generated_at.to_rfc3339()));

        if let Some(branch) = &self.branch {
            out.push_str(&format!("Branch: {}\n", branch));
        }
        if !self.recent_commits.is_empty() {
            out.push_str("\nRecent commits:\n");
            for commit in &self.recent_commits {
                out.push_str(&format!("- {}\n", commit));
            }
        }
        if !self.changed_files.is_empty() {
            out.push_str("\nWorking tree changes:\n");
            for change in &self.changed_files {
                out.push_str(&format!("- {}\n", change));
            }
        }
        if !self.recent_files.is_empty() {
            out.push_str("\nRecently modified:\n");
            for path in &self.recent_files {
                out.push_str(&format!("- {}\n", path));
            }
        }

        out
    }

    /// The snapshot as a chunk in the `dynamic` category
    pub fn as_chunk(&self, tokens: &TokenEstimator) -> ContextChunk {
        ContextChunk::new("dynamic", self.render(), "dynamic", tokens).with_score(1.0)
    }
}

/// Paths of the newest non-hidden files, ties broken by path
fn recent_files(roots: &[ContextRoot], limit: usize) -> Vec<String> {
    if limit == 0 {
        return Vec::new();
    }

    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    for root in roots.iter().filter(|r| r.path.is_dir()) {
        let walker = WalkDir::new(&root.path)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file());

        for entry in walker {
            if let Ok(modified) = entry.metadata().map_err(std::io::Error::from).and_then(|m| m.modified()) {
                files.push((modified, entry.into_path()));
            }
        }
    }

    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    files.dedup_by(|a, b| a.1 == b.1);
    files
        .into_iter()
        .take(limit)
        .map(|(_, path)| path.display().to_string())
        .collect()
}

fn non_empty_lines(output: Option<&str>) -> Vec<String> {
    output
        .map(|text| {
            text.lines()
                .map(str::trim_end)
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Stdout of a successful command, or `None` on spawn failure, non-zero exit, or timeout
async fn run_command(program: &str, args: &[&str], dir: Option<&PathBuf>, timeout: Duration) -> Option<String> {
    let mut cmd = Command::new(program);
    cmd.args(args).kill_on_drop(true);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) if output.status.success() => Some(String::from_utf8_lossy(&output.stdout).into_owned()),
        Ok(Ok(output)) => {
            debug!("{} {:?} exited with {}", program, args, output.status);
            None
        }
        Ok(Err(e)) => {
            debug!("Failed to run {}: {}", program, e);
            None
        }
        Err(_) => {
            warn!("{} {:?} timed out after {:?}", program, args, timeout);
            None
        }
    }
}
