//! Telegram delivery of daily reports and critical alerts.
//!
//! Formatting is kept in pure functions so the message layout is testable
//! without any network. Delivery failures are logged, never propagated: a
//! report the operator misses must not poison an otherwise finished run.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info};

use crate::analysis::prompts::{sentiment_emoji, sentiment_label};
use crate::analysis::SentimentRecord;
use crate::config::TelegramConfig;
use crate::data::retry::RetryPolicy;
use crate::errors::{PipelineError, PipelineResult};

/// A per-target failure carried into the report instead of aborting the run.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub ticker: String,
    pub detail: String,
    pub kind: &'static str,
}

impl ErrorRecord {
    pub fn from_error(ticker: &str, err: &PipelineError) -> Self {
        Self {
            ticker: ticker.to_string(),
            detail: err.user_detail(),
            kind: err.kind(),
        }
    }
}

/// Outbound notification port. The pipeline only talks to this trait, so
/// tests can record deliveries instead of reaching the Telegram API.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// End-of-run report. When every target failed, an error-only report
    /// goes out instead so the operator still hears from the run.
    async fn send_daily_report(
        &self,
        results: &[SentimentRecord],
        total_articles: usize,
        errors: &[ErrorRecord],
        no_news: &[String],
        runtime: Duration,
    ) -> bool;

    /// Short notice for days with zero articles across the whole watchlist.
    async fn send_market_quiet(&self) -> bool;

    /// Best-effort operator alert for fatal conditions. Swallows its own
    /// failures: alerting always happens on an error path already.
    async fn send_critical_alert(&self, kind: &str, message: &str, context: &str);
}

pub struct TelegramClient {
    http: Client,
    bot_token: String,
    chat_id: String,
    base_url: String,
    retry: RetryPolicy,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> PipelineResult<Self> {
        let bot_token = config
            .bot_token
            .clone()
            .ok_or_else(|| PipelineError::Config("TELEGRAM_BOT_TOKEN is not set".to_string()))?;
        let chat_id = config
            .chat_id
            .clone()
            .ok_or_else(|| PipelineError::Config("TELEGRAM_CHAT_ID is not set".to_string()))?;

        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            bot_token,
            chat_id,
            base_url: config.base_url.clone(),
            retry: RetryPolicy::new(3, Duration::from_secs(2), Duration::from_secs(10)),
        })
    }

    async fn deliver(&self, what: &str, text: &str) -> bool {
        match self.send_message(text).await {
            Ok(()) => {
                info!("Sent {}", what);
                true
            }
            Err(err) => {
                error!(error = %err, "Failed to send {}", what);
                false
            }
        }
    }

    async fn send_message(&self, text: &str) -> PipelineResult<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        let body = json!({ "chat_id": self.chat_id, "text": text });

        self.retry
            .run(
                || {
                    let request = self.http.post(&url).json(&body).send();
                    async move {
                        let response = request.await?;
                        let status = response.status();
                        if status.as_u16() == 429 {
                            return Err(PipelineError::RateLimited {
                                context: "telegram sendMessage".to_string(),
                            });
                        }
                        if !status.is_success() {
                            let message = response.text().await.unwrap_or_default();
                            return Err(PipelineError::Api {
                                status_code: status.as_u16(),
                                message,
                            });
                        }
                        Ok(())
                    }
                },
                PipelineError::is_retryable,
            )
            .await
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send_daily_report(
        &self,
        results: &[SentimentRecord],
        total_articles: usize,
        errors: &[ErrorRecord],
        no_news: &[String],
        runtime: Duration,
    ) -> bool {
        let text = if results.is_empty() {
            format_error_report(errors, no_news)
        } else {
            format_report(results, total_articles, errors, no_news, runtime)
        };
        self.deliver("daily report", &text).await
    }

    async fn send_market_quiet(&self) -> bool {
        let text = format!(
            "😴 Quiet day in the markets\n📅 {}\n\nNo relevant news found for any watched \
             symbol. No analysis was run.",
            Utc::now().format("%Y-%m-%d")
        );
        self.deliver("market-quiet notice", &text).await
    }

    async fn send_critical_alert(&self, kind: &str, message: &str, context: &str) {
        let text = format!(
            "🚨 CRITICAL: {}\n📅 {}\n\n{}\n\nContext: {}",
            kind,
            Utc::now().format("%Y-%m-%d %H:%M UTC"),
            message,
            context
        );
        self.deliver("critical alert", &text).await;
    }
}

/// Full report: one block per result, then misses, errors, and run totals.
pub fn format_report(
    results: &[SentimentRecord],
    total_articles: usize,
    errors: &[ErrorRecord],
    no_news: &[String],
    runtime: Duration,
) -> String {
    let mut lines = vec![
        "📊 Daily Market Sentiment Report".to_string(),
        format!("📅 {}", Utc::now().format("%Y-%m-%d")),
        String::new(),
    ];

    for record in results {
        lines.push(format!(
            "{} {}: {}/10 ({})",
            sentiment_emoji(record.sentiment_score),
            record.ticker,
            record.sentiment_score,
            sentiment_label(record.sentiment_score),
        ));
        for insight in record.top_insights.iter().take(3) {
            lines.push(format!("   • {}", insight));
        }
        lines.push(String::new());
    }

    if !no_news.is_empty() {
        lines.push(format!("💤 No news today: {}", no_news.join(", ")));
        lines.push(String::new());
    }

    lines.push(error_section(errors));
    lines.push(String::new());
    lines.push(format!("📰 Articles analyzed: {}", total_articles));
    lines.push(format!("⏱ Runtime: {}", format_runtime(runtime)));

    lines.join("\n")
}

/// Fallback layout for runs where no target produced a result.
pub fn format_error_report(errors: &[ErrorRecord], no_news: &[String]) -> String {
    let mut lines = vec![
        "⚠️ Daily Market Sentiment Report".to_string(),
        format!("📅 {}", Utc::now().format("%Y-%m-%d")),
        String::new(),
        "No analysis results were produced today.".to_string(),
        String::new(),
    ];

    if !no_news.is_empty() {
        lines.push(format!("💤 No news today: {}", no_news.join(", ")));
        lines.push(String::new());
    }

    lines.push(error_section(errors));
    lines.join("\n")
}

fn error_section(errors: &[ErrorRecord]) -> String {
    if errors.is_empty() {
        return "✅ All analyses successful".to_string();
    }
    let mut lines = vec!["⚠️ Errors:".to_string()];
    for record in errors {
        lines.push(format!("   • {}: {}", record.ticker, record.detail));
    }
    lines.join("\n")
}

fn format_runtime(runtime: Duration) -> String {
    let total = runtime.as_secs();
    format!("{}m {}s", total / 60, total % 60)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(ticker: &str, score: i64, insights: &[&str]) -> SentimentRecord {
        SentimentRecord {
            ticker: ticker.to_string(),
            sentiment_score: score,
            top_insights: insights.iter().map(|s| s.to_string()).collect(),
            rationale: "A rationale that is long enough to pass validation.".to_string(),
            news_count: 3,
        }
    }

    #[test]
    fn report_includes_scores_labels_and_totals() {
        let results = vec![
            record("FNILX", 8, &["tech rally", "broad breadth"]),
            record("UURAF", 3, &["spot price weak"]),
        ];
        let report = format_report(&results, 17, &[], &[], Duration::from_secs(133));

        assert!(report.contains("📈 FNILX: 8/10 (Bullish)"));
        assert!(report.contains("📉 UURAF: 3/10 (Bearish)"));
        assert!(report.contains("   • tech rally"));
        assert!(report.contains("✅ All analyses successful"));
        assert!(report.contains("📰 Articles analyzed: 17"));
        assert!(report.contains("⏱ Runtime: 2m 13s"));
    }

    #[test]
    fn report_caps_insights_at_three() {
        let results = vec![record("AAPL", 6, &["one", "two", "three", "four"])];
        let report = format_report(&results, 2, &[], &[], Duration::from_secs(5));

        assert!(report.contains("   • three"));
        assert!(!report.contains("   • four"));
    }

    #[test]
    fn report_lists_errors_and_quiet_symbols() {
        let errors = vec![ErrorRecord {
            ticker: "FZILX".to_string(),
            detail: "LLM returned invalid format - analysis failed".to_string(),
            kind: "parsing",
        }];
        let no_news = vec!["UURAF".to_string()];
        let report = format_report(
            &[record("FNILX", 5, &["flat day"])],
            4,
            &errors,
            &no_news,
            Duration::from_secs(61),
        );

        assert!(report.contains("💤 No news today: UURAF"));
        assert!(report.contains("⚠️ Errors:"));
        assert!(report.contains("   • FZILX: LLM returned invalid format - analysis failed"));
        assert!(!report.contains("✅ All analyses successful"));
    }

    #[test]
    fn error_only_report_when_nothing_succeeded() {
        let errors = vec![
            ErrorRecord {
                ticker: "FNILX".to_string(),
                detail: "Rate limited by API".to_string(),
                kind: "rate_limited",
            },
            ErrorRecord {
                ticker: "UURAF".to_string(),
                detail: "Validation failed".to_string(),
                kind: "validation",
            },
        ];
        let report = format_error_report(&errors, &[]);

        assert!(report.contains("No analysis results were produced today."));
        assert!(report.contains("   • FNILX: Rate limited by API"));
        assert!(report.contains("   • UURAF: Validation failed"));
    }
}
