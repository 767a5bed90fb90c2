use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub news: NewsConfig,
    pub llm: LlmConfig,
    pub telegram: TelegramConfig,
    pub fetch: FetchConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    pub max_retries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub base_url: String,
}

/// News-fetch pacing and windowing. The 1.1s call delay is the primary
/// rate-limit defense: 51 serial calls take ~56s, under the 60/min quota.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub max_articles_per_symbol: usize,
    pub api_call_delay_ms: u64,
    pub max_retries: usize,
    pub retry_min_wait_secs: u64,
    pub retry_max_wait_secs: u64,
    pub default_lookback_hours: i64,
    pub weekend_lookback_hours: i64,
    pub max_summary_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub sentiment_csv: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file - this sets env vars that aren't already set
        dotenv::dotenv().ok();

        let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));

        let config = Config {
            news: NewsConfig {
                api_key: env::var("FINNHUB_API_KEY").ok(),
                base_url: env::var("FINNHUB_BASE_URL")
                    .unwrap_or_else(|_| "https://finnhub.io/api/v1".to_string()),
            },
            llm: LlmConfig {
                api_key: env::var("GROQ_API_KEY").ok(),
                base_url: env::var("GROQ_BASE_URL")
                    .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string()),
                model: env::var("GROQ_MODEL")
                    .unwrap_or_else(|_| "llama-3.1-8b-instant".to_string()),
                temperature: env::var("GROQ_TEMPERATURE")
                    .unwrap_or_else(|_| "0.3".to_string())
                    .parse()
                    .context("Invalid GROQ_TEMPERATURE value")?,
                max_tokens: env::var("GROQ_MAX_TOKENS")
                    .unwrap_or_else(|_| "1024".to_string())
                    .parse()
                    .context("Invalid GROQ_MAX_TOKENS value")?,
                timeout_seconds: env::var("LLM_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("Invalid LLM_TIMEOUT_SECONDS value")?,
                max_retries: 3,
            },
            telegram: TelegramConfig {
                bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
                chat_id: env::var("TELEGRAM_CHAT_ID").ok(),
                base_url: env::var("TELEGRAM_BASE_URL")
                    .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
            },
            fetch: FetchConfig {
                max_articles_per_symbol: env::var("MAX_ARTICLES_PER_TICKER")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .context("Invalid MAX_ARTICLES_PER_TICKER value")?,
                api_call_delay_ms: env::var("API_CALL_DELAY_MS")
                    .unwrap_or_else(|_| "1100".to_string())
                    .parse()
                    .context("Invalid API_CALL_DELAY_MS value")?,
                max_retries: env::var("MAX_RETRIES")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .context("Invalid MAX_RETRIES value")?,
                retry_min_wait_secs: env::var("RETRY_MIN_WAIT")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .context("Invalid RETRY_MIN_WAIT value")?,
                retry_max_wait_secs: env::var("RETRY_MAX_WAIT")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("Invalid RETRY_MAX_WAIT value")?,
                default_lookback_hours: env::var("DEFAULT_LOOKBACK_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()
                    .context("Invalid DEFAULT_LOOKBACK_HOURS value")?,
                weekend_lookback_hours: env::var("WEEKEND_LOOKBACK_HOURS")
                    .unwrap_or_else(|_| "72".to_string())
                    .parse()
                    .context("Invalid WEEKEND_LOOKBACK_HOURS value")?,
                max_summary_length: env::var("MAX_SUMMARY_LENGTH")
                    .unwrap_or_else(|_| "200".to_string())
                    .parse()
                    .context("Invalid MAX_SUMMARY_LENGTH value")?,
            },
            storage: StorageConfig {
                sentiment_csv: data_dir.join("sentiment_history.csv"),
                data_dir,
            },
        };

        Ok(config)
    }

    /// Check that every credential a live run needs is present.
    /// Reports all missing keys at once rather than one per run.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.news.api_key.is_none() {
            missing.push("FINNHUB_API_KEY");
        }
        if self.llm.api_key.is_none() {
            missing.push("GROQ_API_KEY");
        }
        if self.telegram.bot_token.is_none() {
            missing.push("TELEGRAM_BOT_TOKEN");
        }
        if self.telegram.chat_id.is_none() {
            missing.push("TELEGRAM_CHAT_ID");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Missing required environment variables: {}. \
                 Set them in your .env file (local) or CI secrets (production).",
                missing.join(", ")
            )
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            news: NewsConfig {
                api_key: None,
                base_url: "https://finnhub.io/api/v1".to_string(),
            },
            llm: LlmConfig {
                api_key: None,
                base_url: "https://api.groq.com/openai/v1".to_string(),
                model: "llama-3.1-8b-instant".to_string(),
                temperature: 0.3,
                max_tokens: 1024,
                timeout_seconds: 30,
                max_retries: 3,
            },
            telegram: TelegramConfig {
                bot_token: None,
                chat_id: None,
                base_url: "https://api.telegram.org".to_string(),
            },
            fetch: FetchConfig {
                max_articles_per_symbol: 2,
                api_call_delay_ms: 1100,
                max_retries: 5,
                retry_min_wait_secs: 2,
                retry_max_wait_secs: 30,
                default_lookback_hours: 24,
                weekend_lookback_hours: 72,
                max_summary_length: 200,
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("data"),
                sentiment_csv: PathBuf::from("data/sentiment_history.csv"),
            },
        }
    }
}
