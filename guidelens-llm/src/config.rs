//! Provider configuration

use serde::{Deserialize, Serialize};

/// Configuration for the Gemini multimodal provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Model name used for all analysis calls
    pub model: String,

    /// API base URL. HTTPS only.
    pub base_url: String,

    /// Largest media payload sent inline, in bytes
    pub max_inline_bytes: usize,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            max_inline_bytes: 20 * 1024 * 1024,
            request_timeout_secs: 60,
        }
    }
}

impl ProviderConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.model.is_empty() {
            return Err("Model name must be non-empty".to_string());
        }
        if !self.base_url.starts_with("https://") {
            return Err("Base URL must use https".to_string());
        }
        if self.max_inline_bytes == 0 {
            return Err("Max inline bytes must be non-zero".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("Request timeout must be non-zero".to_string());
        }
        Ok(())
    }
}
