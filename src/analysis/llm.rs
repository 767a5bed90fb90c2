use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

use crate::config::LlmConfig;
use crate::data::RetryPolicy;
use crate::errors::{PipelineError, PipelineResult};

/// Port for the text-completion backend. One operation: send a system+user
/// prompt pair, get raw text back. Everything about the response's shape is
/// handled downstream - the backend makes no structural promises.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> PipelineResult<String>;
}

/// Groq chat-completions client (OpenAI-compatible API).
pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl GroqClient {
    pub fn new(config: &LlmConfig) -> PipelineResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| PipelineError::Authentication("Groq API key not configured".into()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("marketpulse/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: RetryPolicy::new(
                config.max_retries,
                Duration::from_secs(2),
                Duration::from_secs(10),
            ),
        })
    }

    async fn request(&self, system_prompt: &str, user_prompt: &str) -> PipelineResult<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(PipelineError::RateLimited {
                context: format!("chat-completions/{}", self.model),
            });
        }
        if matches!(status.as_u16(), 401 | 403) {
            return Err(PipelineError::Authentication(format!(
                "Groq authentication failed: {}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| "unknown".into());
            return Err(PipelineError::Api {
                status_code: status.as_u16(),
                message: format!("Groq API error: {}", message),
            });
        }

        let payload: Value = response.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| PipelineError::Api {
                status_code: status.as_u16(),
                message: "Groq response missing choices[0].message.content".into(),
            })?;

        debug!(model = self.model.as_str(), chars = content.len(), "Completion received");
        Ok(content.to_string())
    }
}

#[async_trait]
impl CompletionBackend for GroqClient {
    /// Retries apply to the network call only. A structurally bad response
    /// is not the transport's problem and is never retried here.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> PipelineResult<String> {
        self.retry
            .run(
                || self.request(system_prompt, user_prompt),
                PipelineError::is_retryable,
            )
            .await
            .map_err(|e| {
                error!(model = self.model.as_str(), error = %e, "Groq API call failed");
                e
            })
    }
}
