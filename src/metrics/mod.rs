//! Token usage and cost tracking

use crate::tokens::TokenEstimator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// File name of the usage log inside the cache directory
pub const USAGE_FILE: &str = "usage.jsonl";

#[derive(Error, Debug)]
pub enum UsageError {
    #[error("Usage log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode usage record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl UsageRecord {
    /// Record priced with the estimator's tables
    pub fn new(model: impl Into<String>, input_tokens: u64, output_tokens: u64, tokens: &TokenEstimator) -> Self {
        let model = model.into();
        let cost_usd = tokens.estimate_cost(input_tokens as usize, output_tokens as usize, &model);
        Self {
            timestamp: Utc::now(),
            model,
            input_tokens,
            output_tokens,
            cost_usd,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Append-only JSON lines log
pub struct UsageLog {
    path: PathBuf,
}

impl UsageLog {
    pub fn open(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(USAGE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &UsageRecord) -> Result<(), UsageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// All readable records; malformed lines are skipped with a warning
    pub fn load(&self) -> Result<Vec<UsageRecord>, UsageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping malformed usage record at {}:{}: {}", self.path.display(), i + 1, e),
            }
        }
        Ok(records)
    }
}

/// Aggregates usage records
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    records: Vec<UsageRecord>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<UsageRecord>) -> Self {
        Self { records }
    }

    pub fn record(&mut self, record: UsageRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Totals over records at or after `since` (all records when `None`)
    pub fn summary(&self, since: Option<DateTime<Utc>>) -> UsageSummary {
        let mut summary = UsageSummary {
            since,
            ..Default::default()
        };
        let mut per_model: BTreeMap<&str, ModelUsage> = BTreeMap::new();

        for record in self.records.iter().filter(|r| since.map_or(true, |s| r.timestamp >= s)) {
            summary.request_count += 1;
            summary.total_input_tokens += record.input_tokens;
            summary.total_output_tokens += record.output_tokens;
            summary.estimated_cost += record.cost_usd;

            let model = per_model.entry(&record.model).or_insert_with(|| ModelUsage {
                model: record.model.clone(),
                ..Default::default()
            });
            model.request_count += 1;
            model.input_tokens += record.input_tokens;
            model.output_tokens += record.output_tokens;
            model.cost_usd += record.cost_usd;
        }

        summary.per_model = per_model.into_values().collect();
        summary.per_model.sort_by(|a, b| b.cost_usd.total_cmp(&a.cost_usd).then_with(|| a.model.cmp(&b.model)));
        summary
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelUsage {
    pub model: String,
    pub request_count: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    pub request_count: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub estimated_cost: f64,
    /// Most expensive first
    pub per_model: Vec<ModelUsage>,
}

impl UsageSummary {
    pub fn total_tokens(&self) -> u64 {
        self.total_input_tokens + self.total_output_tokens
    }

    pub fn avg_tokens_per_request(&self) -> f64 {
        if self.request_count == 0 {
            return 0.0;
        }
        self.total_tokens() as f64 / self.request_count as f64
    }
}

impl std::fmt::Display for UsageSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Token Usage Summary ===")?;
        if let Some(since) = self.since {
            writeln!(f, "Since: {}", since.format("%Y-%m-%d %H:%M UTC"))?;
        }
        writeln!(f, "Total requests: {}", self.request_count)?;
        writeln!(f, "Input tokens: {}", self.total_input_tokens)?;
        writeln!(f, "Output tokens: {}", self.total_output_tokens)?;
        writeln!(f, "Avg tokens/request: {:.1}", self.avg_tokens_per_request())?;
        writeln!(f, "Estimated cost: ${:.4}", self.estimated_cost)?;

        if !self.per_model.is_empty() {
            writeln!(f, "\nBy model:")?;
            for model in &self.per_model {
                writeln!(
                    f,
                    "  {:<32} {:>5} req  {:>10} in  {:>10} out  ${:.4}",
                    model.model, model.request_count, model.input_tokens, model.output_tokens, model.cost_usd
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(model: &str, input: u64, output: u64, cost: f64) -> UsageRecord {
        UsageRecord {
            timestamp: Utc::now(),
            model: model.to_string(),
            input_tokens: input,
            output_tokens: output,
            cost_usd: cost,
            label: None,
        }
    }

    #[test]
    fn test_record_is_priced() {
        let tokens = TokenEstimator::default();
        let rec = UsageRecord::new("claude-sonnet-4-20250514", 1_000_000, 0, &tokens).with_label("select");
        assert!((rec.cost_usd - 3.0).abs() < 1e-9);
        assert_eq!(rec.label.as_deref(), Some("select"));

        let unknown = UsageRecord::new("mystery-model", 1000, 1000, &tokens);
        assert_eq!(unknown.cost_usd, 0.0);
    }

    #[test]
    fn test_log_append_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let log = UsageLog::open(dir.path().join("nested"));
        assert!(log.load().unwrap().is_empty());

        let first = record("gpt-4o", 10, 5, 0.1);
        let second = record("claude-sonnet-4", 20, 10, 0.2).with_label("task");
        log.append(&first).unwrap();
        log.append(&second).unwrap();

        assert_eq!(log.load().unwrap(), vec![first, second]);
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let log = UsageLog::open(dir.path());
        log.append(&record("gpt-4o", 1, 1, 0.0)).unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(log.path())
            .unwrap()
            .write_all(b"{broken\n\n")
            .unwrap();
        log.append(&record("gpt-4o", 2, 2, 0.0)).unwrap();

        assert_eq!(log.load().unwrap().len(), 2);
    }

    #[test]
    fn test_summary_totals_and_breakdown() {
        let mut tracker = UsageTracker::new();
        tracker.record(record("gpt-4o", 100, 50, 0.5));
        tracker.record(record("claude-sonnet-4", 200, 100, 2.0));
        tracker.record(record("gpt-4o", 100, 50, 0.5));

        let summary = tracker.summary(None);
        assert_eq!(summary.request_count, 3);
        assert_eq!(summary.total_tokens(), 600);
        assert!((summary.avg_tokens_per_request() - 200.0).abs() < 1e-9);
        assert!((summary.estimated_cost - 3.0).abs() < 1e-9);

        assert_eq!(summary.per_model.len(), 2);
        assert_eq!(summary.per_model[0].model, "claude-sonnet-4");
        assert_eq!(summary.per_model[1].request_count, 2);

        let text = summary.to_string();
        assert!(text.contains("Total requests: 3"));
        assert!(text.contains("Estimated cost: $3.0000"));
    }

    #[test]
    fn test_summary_since_filters() {
        let mut old = record("gpt-4o", 100, 0, 1.0);
        old.timestamp = Utc::now() - chrono::Duration::days(10);
        let tracker = UsageTracker::from_records(vec![old, record("gpt-4o", 5, 0, 0.01)]);

        let recent = tracker.summary(Some(Utc::now() - chrono::Duration::days(7)));
        assert_eq!(recent.request_count, 1);
        assert_eq!(recent.total_input_tokens, 5);
        assert_eq!(tracker.summary(None).request_count, 2);
    }

    #[test]
    fn test_empty_summary() {
        let summary = UsageTracker::new().summary(None);
        assert_eq!(summary.avg_tokens_per_request(), 0.0);
        assert!(summary.per_model.is_empty());
    }
}
