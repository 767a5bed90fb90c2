//! Sentiment analysis module: LLM backend, prompt composition, and the
//! defensive extraction/validation of the model's free-text responses.

pub mod llm;
pub mod prompts;
pub mod sentiment;

pub use llm::{CompletionBackend, GroqClient};
pub use sentiment::SentimentAnalyzer;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::data::truncate_chars;
use crate::errors::{PipelineError, PipelineResult};

/// Canonical sentiment output, valid by construction: score in [1,10],
/// 1-3 insights, rationale of at least 20 characters. Never mutated after
/// validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub ticker: String,
    pub sentiment_score: i64,
    pub top_insights: Vec<String>,
    pub rationale: String,
    pub news_count: usize,
}

type ExtractionStrategy = fn(&str) -> Option<Value>;

/// Ordered chain of extraction strategies. Models wrap JSON in prose or
/// markdown fences often enough that a single parse is not viable; each
/// strategy is tried in turn and the first well-formed object wins.
const EXTRACTION_STRATEGIES: &[ExtractionStrategy] =
    &[parse_direct, parse_code_fence, parse_brace_span];

/// Extract a JSON object from a possibly-malformed LLM response.
pub fn extract_json(text: &str) -> PipelineResult<Value> {
    for strategy in EXTRACTION_STRATEGIES {
        if let Some(value) = strategy(text) {
            if value.is_object() {
                return Ok(value);
            }
        }
    }
    Err(PipelineError::Parsing {
        excerpt: truncate_chars(text, 200),
    })
}

fn parse_direct(text: &str) -> Option<Value> {
    serde_json::from_str(text.trim()).ok()
}

/// ```json ... ``` or ``` ... ``` fenced block.
fn parse_code_fence(text: &str) -> Option<Value> {
    let start = text.find("```")?;
    let rest = &text[start + 3..];
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let end = rest.find("```")?;
    serde_json::from_str(rest[..end].trim()).ok()
}

/// Substring from the first `{` through the last `}`.
fn parse_brace_span(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Validate and normalize an extracted response into a `SentimentRecord`.
///
/// Steps, in order: required fields, score coercion and range, insights
/// shape and truncation, rationale length. `news_count` is filled by the
/// caller since the model never sees it.
pub fn validate_record(value: &Value) -> PipelineResult<SentimentRecord> {
    let obj = value
        .as_object()
        .ok_or_else(|| PipelineError::validation("response is not a JSON object"))?;

    let required = ["ticker", "sentiment_score", "top_insights", "rationale"];
    let missing: Vec<&str> = required
        .iter()
        .filter(|field| !obj.contains_key(**field))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    let score = coerce_score(&obj["sentiment_score"])?;
    if !(1..=10).contains(&score) {
        return Err(PipelineError::validation(format!(
            "sentiment_score out of range: {}",
            obj["sentiment_score"]
        )));
    }

    let insights = obj["top_insights"]
        .as_array()
        .filter(|list| !list.is_empty())
        .ok_or_else(|| PipelineError::validation("top_insights must be a non-empty list"))?;
    if insights.len() < 2 {
        // Quality warning, not an error: one insight is thin but usable
        warn!(count = insights.len(), "Model returned fewer than 2 insights");
    }
    let top_insights: Vec<String> = insights
        .iter()
        .take(3)
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .unwrap_or_else(|| item.to_string())
        })
        .collect();

    let rationale = obj["rationale"]
        .as_str()
        .ok_or_else(|| PipelineError::validation("rationale must be a string"))?;
    if rationale.chars().count() < 20 {
        return Err(PipelineError::validation(
            "rationale too short (min 20 characters)",
        ));
    }

    let ticker = obj["ticker"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| obj["ticker"].to_string());

    Ok(SentimentRecord {
        ticker,
        sentiment_score: score,
        top_insights,
        rationale: rationale.to_string(),
        news_count: 0,
    })
}

fn coerce_score(value: &Value) -> PipelineResult<i64> {
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    if let Some(f) = value.as_f64() {
        return Ok(f.trunc() as i64);
    }
    if let Some(s) = value.as_str() {
        if let Ok(n) = s.trim().parse::<i64>() {
            return Ok(n);
        }
    }
    Err(PipelineError::validation(format!(
        "invalid sentiment_score: {}",
        value
    )))
}
