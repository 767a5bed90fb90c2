//! Append-only CSV persistence for analysis results.
//!
//! Every run appends one row per analyzed target to a single long-lived
//! file, giving a local history that spreadsheets and notebooks can read
//! without any extra tooling.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analysis::SentimentRecord;
use crate::errors::PipelineResult;

/// One persisted row. Insights are pipe-joined so the row stays flat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentRow {
    pub timestamp: String,
    pub ticker: String,
    pub sentiment_score: i64,
    pub insights: String,
    pub rationale: String,
    pub news_count: usize,
    pub success: bool,
}

pub struct SentimentLog {
    path: PathBuf,
}

impl SentimentLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a single record. The header is written only when the file is
    /// created, so repeated runs accumulate rows under one header.
    pub fn append(&self, record: &SentimentRecord) -> PipelineResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let write_header = !self.path.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);

        let row = SentimentRow {
            timestamp: Utc::now().to_rfc3339(),
            ticker: record.ticker.clone(),
            sentiment_score: record.sentiment_score,
            insights: record.top_insights.join(" | "),
            rationale: record.rationale.clone(),
            news_count: record.news_count,
            success: true,
        };
        writer.serialize(&row)?;
        writer.flush()?;

        debug!(ticker = %record.ticker, path = %self.path.display(), "Appended sentiment row");
        Ok(())
    }

    pub fn append_all(&self, records: &[SentimentRecord]) -> PipelineResult<usize> {
        for record in records {
            self.append(record)?;
        }
        if !records.is_empty() {
            info!(
                rows = records.len(),
                path = %self.path.display(),
                "Persisted sentiment results"
            );
        }
        Ok(records.len())
    }

    /// Reads the full history back. Mostly used by tests and ad-hoc
    /// inspection; the pipeline itself only appends.
    pub fn entries(&self) -> PipelineResult<Vec<SentimentRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(ticker: &str, score: i64) -> SentimentRecord {
        SentimentRecord {
            ticker: ticker.to_string(),
            sentiment_score: score,
            top_insights: vec!["first insight".to_string(), "second insight".to_string()],
            rationale: "A rationale that is comfortably long enough.".to_string(),
            news_count: 4,
        }
    }

    #[test]
    fn append_creates_file_with_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = SentimentLog::new(dir.path().join("sentiment_log.csv"));

        log.append(&record("FNILX", 7)).unwrap();
        log.append(&record("UURAF", 4)).unwrap();

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.matches("timestamp,ticker").count(), 1);

        let rows = log.entries().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ticker, "FNILX");
        assert_eq!(rows[0].insights, "first insight | second insight");
        assert_eq!(rows[1].sentiment_score, 4);
        assert!(rows.iter().all(|r| r.success));
    }

    #[test]
    fn append_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let log = SentimentLog::new(dir.path().join("nested/data/sentiment_log.csv"));

        log.append_all(&[record("AAPL", 9)]).unwrap();
        assert_eq!(log.entries().unwrap().len(), 1);
    }

    #[test]
    fn entries_on_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = SentimentLog::new(dir.path().join("absent.csv"));
        assert!(log.entries().unwrap().is_empty());
    }
}
