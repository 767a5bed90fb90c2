//! Data pipeline module: news provider client, batch fetcher, holdings scraper
//! Provides typed errors and relevance/window policies for the daily run

pub mod fetcher;
pub mod holdings;
pub mod news;
pub mod retry;

// Re-export commonly used types
pub use fetcher::NewsFetcher;
pub use holdings::HoldingsScraper;
pub use news::{FinnhubClient, NewsApi};
pub use retry::RetryPolicy;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{PipelineError, PipelineResult};

/// Article as returned by the news provider, before any filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArticle {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub datetime: i64,
}

/// Relevance-filtered article, summary already truncated to the configured
/// maximum so downstream prompt size stays bounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub ticker: String,
    pub sector: String,
    pub headline: String,
    pub summary: String,
    pub source: String,
}

/// Mapping from symbol to its relevant articles.
///
/// Invariant: a symbol is only present if it has at least one article.
/// Absence means "no news", never an empty list.
#[derive(Debug, Clone, Default)]
pub struct NewsBatch {
    by_symbol: BTreeMap<String, Vec<Article>>,
}

impl NewsBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert is a no-op for an empty article list, preserving the
    /// absence-means-no-news invariant.
    pub fn insert(&mut self, symbol: impl Into<String>, articles: Vec<Article>) {
        if !articles.is_empty() {
            self.by_symbol.insert(symbol.into(), articles);
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&[Article]> {
        self.by_symbol.get(symbol).map(Vec::as_slice)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.by_symbol.contains_key(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &String> {
        self.by_symbol.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Article>)> {
        self.by_symbol.iter()
    }

    pub fn symbol_count(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn total_articles(&self) -> usize {
        self.by_symbol.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

/// Truncate a string to at most `max` characters (char-safe).
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Validation helpers
pub mod validation {
    use super::*;

    /// Validate a ticker symbol: 1-12 chars from the charset US and
    /// international listings actually use (letters, digits, `.`, `-`, `:`).
    pub fn validate_symbol(symbol: &str) -> PipelineResult<()> {
        let trimmed = symbol.trim();
        if trimmed.is_empty() || trimmed.len() > 12 {
            return Err(PipelineError::InvalidSymbol(symbol.to_string()));
        }

        let valid = trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'));
        if !valid {
            return Err(PipelineError::InvalidSymbol(symbol.to_string()));
        }

        Ok(())
    }

    pub fn is_valid_symbol(symbol: &str) -> bool {
        validate_symbol(symbol).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(ticker: &str) -> Article {
        Article {
            ticker: ticker.to_string(),
            sector: "Unknown".to_string(),
            headline: "headline".to_string(),
            summary: "summary".to_string(),
            source: "src".to_string(),
        }
    }

    #[test]
    fn batch_rejects_empty_lists() {
        let mut batch = NewsBatch::new();
        batch.insert("AAPL", vec![]);
        assert!(!batch.contains("AAPL"));
        assert!(batch.is_empty());

        batch.insert("NVDA", vec![article("NVDA")]);
        assert!(batch.contains("NVDA"));
        assert_eq!(batch.total_articles(), 1);
        assert_eq!(batch.symbol_count(), 1);
    }

    #[test]
    fn symbol_validation_accepts_real_formats() {
        assert!(validation::is_valid_symbol("AAPL"));
        assert!(validation::is_valid_symbol("BRK.B"));
        assert!(validation::is_valid_symbol("TPE:2330"));
        assert!(validation::is_valid_symbol("UURAF"));
    }

    #[test]
    fn symbol_validation_rejects_bad_formats() {
        assert!(!validation::is_valid_symbol(""));
        assert!(!validation::is_valid_symbol("WAY TOO LONG SYMBOL"));
        assert!(!validation::is_valid_symbol("AAPL$"));
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }
}
