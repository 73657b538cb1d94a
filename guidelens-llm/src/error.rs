use guidelens_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API key not set for provider: {0}")]
    MissingApiKey(String),

    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LlmError>;

impl From<LlmError> for CoreError {
    fn from(err: LlmError) -> Self {
        CoreError::Analysis(err.to_string())
    }
}
