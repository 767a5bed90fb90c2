use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

use super::llm::CompletionBackend;
use super::prompts::{self, SYSTEM_PROMPT};
use super::{extract_json, validate_record, SentimentRecord};
use crate::data::{truncate_chars, Article};
use crate::errors::{PipelineError, PipelineResult};

/// Literal marker the prompts instruct the model to emit when evidence is
/// too sparse or stale to judge. Checked as a raw substring on the rationale
/// before schema validation: an intentional "I don't know" outranks a
/// malformed answer. A free-text convention and known to be brittle, but it
/// is the given contract.
pub const INSUFFICIENT_DATA_MARKER: &str = "Insufficient Data";

/// One backend call per target: a fund's holdings are analyzed in a single
/// aggregate request, each tracked symbol in its own request.
pub struct SentimentAnalyzer {
    backend: Arc<dyn CompletionBackend>,
    max_summary_length: usize,
}

impl SentimentAnalyzer {
    pub fn new(backend: Arc<dyn CompletionBackend>, max_summary_length: usize) -> Self {
        Self {
            backend,
            max_summary_length,
        }
    }

    /// Aggregate fund-level analysis over every holding with news.
    pub async fn analyze_aggregate(
        &self,
        fund_name: &str,
        news_by_ticker: &BTreeMap<String, Vec<Article>>,
        sectors: &HashMap<String, String>,
        total_holdings: usize,
    ) -> PipelineResult<SentimentRecord> {
        let active_count = news_by_ticker.len();
        info!(
            fund = fund_name,
            active_holdings = active_count,
            "Analyzing aggregate sentiment"
        );

        let mut articles = Vec::new();
        for (ticker, list) in news_by_ticker {
            let sector = sectors
                .get(ticker)
                .map(String::as_str)
                .unwrap_or("Unknown");
            for article in list {
                articles.push(Article {
                    ticker: ticker.clone(),
                    sector: sector.to_string(),
                    headline: article.headline.clone(),
                    // Hard boundary against summary growth from any caller;
                    // the fetcher already truncated, this enforces it again.
                    summary: truncate_chars(&article.summary, self.max_summary_length),
                    source: article.source.clone(),
                });
            }
        }

        let total = if total_holdings == 0 {
            active_count
        } else {
            total_holdings
        };
        let prompt = prompts::aggregate_prompt(fund_name, &articles, active_count, total);

        let mut record = self.run_analysis(fund_name, &prompt).await?;
        record.news_count = articles.len();
        Ok(record)
    }

    /// Individual single-stock analysis.
    pub async fn analyze_individual(
        &self,
        ticker: &str,
        sector: &str,
        articles: &[Article],
    ) -> PipelineResult<SentimentRecord> {
        info!(
            ticker,
            articles = articles.len(),
            "Analyzing individual sentiment"
        );

        let truncated: Vec<Article> = articles
            .iter()
            .map(|article| Article {
                ticker: article.ticker.clone(),
                sector: sector.to_string(),
                headline: article.headline.clone(),
                summary: truncate_chars(&article.summary, self.max_summary_length),
                source: article.source.clone(),
            })
            .collect();

        let prompt = prompts::individual_prompt(ticker, sector, &truncated);

        let mut record = self.run_analysis(ticker, &prompt).await?;
        record.news_count = articles.len();
        Ok(record)
    }

    /// Shared call-extract-check-validate sequence. Validation failures are
    /// terminal for the target: retrying an identical prompt is unlikely to
    /// fix a structural violation and wastes quota.
    async fn run_analysis(&self, target: &str, prompt: &str) -> PipelineResult<SentimentRecord> {
        let raw = self.backend.complete(SYSTEM_PROMPT, prompt).await?;
        let value = extract_json(&raw)?;

        if rationale_declines(&value) {
            warn!(target, "Model returned 'Insufficient Data'");
            return Err(PipelineError::InsufficientData(format!(
                "Insufficient news data for {} analysis",
                target
            )));
        }

        let record = validate_record(&value)?;
        info!(
            target,
            score = record.sentiment_score,
            "Analysis complete"
        );
        Ok(record)
    }
}

fn rationale_declines(value: &Value) -> bool {
    value
        .get("rationale")
        .and_then(Value::as_str)
        .map_or(false, |rationale| rationale.contains(INSUFFICIENT_DATA_MARKER))
}
