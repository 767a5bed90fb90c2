use async_trait::async_trait;
use chrono::NaiveDate;

use super::{validation, RawArticle};
use crate::config::NewsConfig;
use crate::errors::{PipelineError, PipelineResult};

/// Port for the company-news provider. The pipeline only ever needs one
/// operation; keeping it behind a trait lets tests substitute a scripted
/// provider without touching the fetch loop.
#[async_trait]
pub trait NewsApi: Send + Sync {
    /// Fetch news for one symbol over a date window.
    ///
    /// Distinguished failures: `RateLimited` (transient, caller retries) and
    /// `Authentication` (systemic, caller aborts). Any other provider-side
    /// problem degrades to an empty article list.
    async fn company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PipelineResult<Vec<RawArticle>>;
}

/// Finnhub company-news client.
pub struct FinnhubClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl FinnhubClient {
    pub fn new(config: &NewsConfig) -> PipelineResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| PipelineError::Authentication("Finnhub API key not configured".into()))?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent(concat!("marketpulse/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl NewsApi for FinnhubClient {
    async fn company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PipelineResult<Vec<RawArticle>> {
        validation::validate_symbol(symbol)?;

        let url = format!("{}/company-news", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("from", &from.format("%Y-%m-%d").to_string()),
                ("to", &to.format("%Y-%m-%d").to_string()),
                ("token", &self.api_key),
            ])
            .send()
            .await?;

        let status = response.status();

        // 429 is transient and retried by the caller's policy
        if status.as_u16() == 429 {
            tracing::warn!(symbol, "Finnhub rate limit hit, will retry");
            return Err(PipelineError::RateLimited {
                context: format!("company-news/{}", symbol),
            });
        }

        // 401/403 are systemic, never retried
        if matches!(status.as_u16(), 401 | 403) {
            return Err(PipelineError::Authentication(format!(
                "Finnhub authentication failed: {}",
                status.as_u16()
            )));
        }

        // Any other failure degrades to "no news for this symbol"
        if !status.is_success() {
            tracing::error!(symbol, status = status.as_u16(), "Finnhub API error");
            return Ok(Vec::new());
        }

        let articles: Vec<RawArticle> = response.json().await?;
        tracing::debug!(symbol, count = articles.len(), "Fetched articles");
        Ok(articles)
    }
}
