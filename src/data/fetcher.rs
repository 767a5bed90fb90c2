use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::news::NewsApi;
use super::retry::RetryPolicy;
use super::{truncate_chars, Article, NewsBatch, RawArticle};
use crate::config::FetchConfig;
use crate::errors::{PipelineError, PipelineResult};

/// Serial news fetcher for the full symbol universe.
///
/// One provider call per symbol with a fixed delay after every call. The
/// delay, not retry backoff, is what keeps the run under the provider's
/// request quota, so it applies unconditionally - success, failure, or skip.
pub struct NewsFetcher {
    api: Arc<dyn NewsApi>,
    config: FetchConfig,
    retry: RetryPolicy,
}

impl NewsFetcher {
    pub fn new(api: Arc<dyn NewsApi>, config: FetchConfig) -> Self {
        let retry = RetryPolicy::new(
            config.max_retries,
            Duration::from_secs(config.retry_min_wait_secs),
            Duration::from_secs(config.retry_max_wait_secs),
        );
        Self { api, config, retry }
    }

    /// Sunday and Monday extend the window so Friday/weekend events are still
    /// visible once weekend news volume settles.
    pub fn lookback_hours(&self, day: Weekday) -> i64 {
        if matches!(day, Weekday::Sun | Weekday::Mon) {
            self.config.weekend_lookback_hours
        } else {
            self.config.default_lookback_hours
        }
    }

    /// Compute the (from, to) date window for a fetch starting at `now`.
    pub fn fetch_window(&self, now: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
        let hours = self.lookback_hours(now.weekday());
        if hours != self.config.default_lookback_hours {
            info!(hours, "Weekend detected - using extended lookback");
        }
        let from = (now - chrono::Duration::hours(hours)).date_naive();
        (from, now.date_naive())
    }

    /// Fetch news for all symbols, strictly serially.
    ///
    /// Returns only symbols with at least one relevant article. Per-symbol
    /// failures are logged and skipped; an authentication failure aborts the
    /// whole batch since it is systemic, not transient.
    pub async fn fetch(
        &self,
        symbols: &[String],
        company_names: &HashMap<String, String>,
        sectors: &HashMap<String, String>,
    ) -> PipelineResult<NewsBatch> {
        let (from, to) = self.fetch_window(Utc::now());
        info!(
            %from,
            %to,
            symbols = symbols.len(),
            "Fetching news window"
        );

        let mut batch = NewsBatch::new();
        let delay = Duration::from_millis(self.config.api_call_delay_ms);

        for (idx, symbol) in symbols.iter().enumerate() {
            info!("Processing {}/{}: {}", idx + 1, symbols.len(), symbol);

            let result = self
                .retry
                .run(
                    || self.api.company_news(symbol, from, to),
                    |e| matches!(e, PipelineError::RateLimited { .. }),
                )
                .await;

            // Preventative delay between ALL requests, including the last
            // attempt before an abort. Layer 1 of rate-limit defense.
            tokio::time::sleep(delay).await;

            match result {
                Ok(raw_articles) => {
                    let articles = self.select_relevant(symbol, raw_articles, company_names, sectors);
                    if !articles.is_empty() {
                        info!(
                            symbol = symbol.as_str(),
                            kept = articles.len(),
                            "Relevant articles found"
                        );
                        batch.insert(symbol.clone(), articles);
                    }
                }
                Err(err) if err.is_fatal() => {
                    error!("News provider authentication failed - aborting batch fetch");
                    return Err(err);
                }
                Err(err) => {
                    warn!(symbol = symbol.as_str(), error = %err, "Failed to fetch news, skipping symbol");
                }
            }
        }

        info!(
            symbols_with_news = batch.symbol_count(),
            total_symbols = symbols.len(),
            total_articles = batch.total_articles(),
            "Batch fetch complete"
        );

        Ok(batch)
    }

    /// Apply relevance filter, per-symbol cap, and summary truncation.
    fn select_relevant(
        &self,
        symbol: &str,
        raw_articles: Vec<RawArticle>,
        company_names: &HashMap<String, String>,
        sectors: &HashMap<String, String>,
    ) -> Vec<Article> {
        let company = company_names
            .get(symbol)
            .map(String::as_str)
            .unwrap_or(symbol);
        let sector = sectors
            .get(symbol)
            .map(String::as_str)
            .unwrap_or("Unknown");

        raw_articles
            .into_iter()
            .filter(|raw| is_relevant(symbol, company, raw))
            .take(self.config.max_articles_per_symbol)
            .map(|raw| Article {
                ticker: symbol.to_string(),
                sector: sector.to_string(),
                headline: raw.headline,
                summary: truncate_chars(&raw.summary, self.config.max_summary_length),
                source: raw.source,
            })
            .collect()
    }
}

/// An article is relevant if the symbol or company name appears in the
/// headline or the first 100 characters of the summary, case-insensitive.
/// Removes homonym noise like "Microsoft Excel tips" matching a spreadsheet
/// query rather than the ticker.
pub fn is_relevant(symbol: &str, company_name: &str, article: &RawArticle) -> bool {
    let headline = article.headline.to_lowercase();
    let lead = truncate_chars(&article.summary, 100).to_lowercase();
    let symbol = symbol.to_lowercase();
    let company = company_name.to_lowercase();

    headline.contains(&symbol)
        || lead.contains(&symbol)
        || headline.contains(&company)
        || lead.contains(&company)
}
