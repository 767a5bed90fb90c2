use thiserror::Error;

/// Error taxonomy for the whole pipeline.
///
/// Every failure is produced as a typed variant at the point it occurs, so
/// downstream code (orchestrator, reports) can branch on the variant instead
/// of reconstructing severity from message text.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded for {context}")]
    RateLimited { context: String },

    #[error("Insufficient news data: {0}")]
    InsufficientData(String),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("No valid JSON found in LLM response (first 200 chars: {excerpt})")]
    Parsing { excerpt: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Invalid symbol format: {0}")]
    InvalidSymbol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Check if error is worth another attempt with the same input.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::RateLimited { .. } => true,
            PipelineError::Transport(_) => true,
            // Server errors (5xx) and rate limiting (429)
            PipelineError::Api { status_code, .. } => *status_code >= 500 || *status_code == 429,
            _ => false,
        }
    }

    /// Fatal errors abort the entire run and trigger a critical alert.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Authentication(_))
    }

    /// Machine tag used in error records and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Authentication(_) => "Authentication",
            PipelineError::RateLimited { .. } => "RateLimited",
            PipelineError::InsufficientData(_) => "InsufficientData",
            PipelineError::Validation { .. } => "Validation",
            PipelineError::Parsing { .. } => "Parsing",
            PipelineError::Transport(_) => "Transport",
            PipelineError::Api { .. } => "Api",
            PipelineError::InvalidSymbol(_) => "InvalidSymbol",
            PipelineError::Config(_) => "Config",
            PipelineError::Serialization(_) => "Serialization",
            PipelineError::Io(_) => "Io",
            PipelineError::Csv(_) => "Csv",
        }
    }

    /// Human-readable classification for delivered reports.
    pub fn user_detail(&self) -> String {
        match self {
            // The message carries the provider and real status code (401 vs
            // 403), so the report must not restate a hardcoded one
            PipelineError::Authentication(message) => {
                format!("{} - check API key", truncate_detail(message))
            }
            PipelineError::RateLimited { .. } => {
                "Rate limit exceeded - too many requests".to_string()
            }
            PipelineError::Api { status_code: 503, .. } => {
                "503 Service unavailable - API temporarily down".to_string()
            }
            PipelineError::Api { status_code, .. } if *status_code >= 500 => {
                format!("{} Server error - API having issues", status_code)
            }
            PipelineError::Api { status_code, .. } if *status_code >= 400 => {
                format!("{} Client error - invalid request", status_code)
            }
            PipelineError::Transport(e) if e.is_timeout() => {
                "Connection timeout - API not responding".to_string()
            }
            PipelineError::Transport(e) if e.is_connect() => {
                "Connection failed - network issue or API down".to_string()
            }
            PipelineError::Parsing { .. } | PipelineError::Serialization(_) => {
                "LLM returned invalid format - analysis failed".to_string()
            }
            PipelineError::InsufficientData(_) => "Insufficient data for analysis".to_string(),
            other => truncate_detail(&other.to_string()),
        }
    }

    /// Create a validation error with context
    pub fn validation<S: Into<String>>(message: S) -> Self {
        PipelineError::Validation {
            message: message.into(),
        }
    }
}

fn truncate_detail(message: &str) -> String {
    if message.chars().count() > 100 {
        let head: String = message.chars().take(100).collect();
        format!("{}...", head)
    } else {
        message.to_string()
    }
}
