//! Gemini multimodal analysis provider

use crate::config::ProviderConfig;
use crate::error::{LlmError, Result};
use crate::provider::MultimodalAnalyzer;
use async_trait::async_trait;
use base64::Engine as _;
use bytes::Bytes;
use parking_lot::RwLock;
use reqwest::Client;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct GeminiAnalyzer {
    api_key: Arc<RwLock<Option<String>>>,
    client: Client,
    config: ProviderConfig,
}

impl GeminiAnalyzer {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.validate().map_err(LlmError::Provider)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            api_key: Arc::new(RwLock::new(None)),
            client,
            config,
        })
    }

    pub fn with_api_key(config: ProviderConfig, api_key: String) -> Result<Self> {
        let provider = Self::new(config)?;
        provider.set_api_key(api_key);
        Ok(provider)
    }

    pub fn set_api_key(&self, key: String) {
        *self.api_key.write() = Some(key);
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.read().is_some()
    }

    fn get_api_key(&self) -> Result<String> {
        self.api_key
            .read()
            .as_ref()
            .cloned()
            .ok_or_else(|| LlmError::MissingApiKey("Gemini".to_string()))
    }

    /// POST a generateContent body and extract the guidance text
    async fn generate(&self, parts: Vec<Value>) -> Result<String> {
        let api_key = self.get_api_key()?;

        // URL encode model name to prevent injection
        let model_encoded = urlencoding::encode(&self.config.model);
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, model_encoded, api_key
        );

        let body = json!({
            "contents": [{
                "role": "user",
                "parts": parts,
            }],
        });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LlmError::RateLimit);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::InvalidResponse(format!(
                "HTTP {}: {}",
                status, text
            )));
        }

        let json: Value = response.json().await?;
        extract_text(&json)
    }

    fn check_inline_size(&self, len: usize) -> Result<()> {
        if len > self.config.max_inline_bytes {
            return Err(LlmError::Provider(format!(
                "Media too large to send inline: {} bytes (max {})",
                len, self.config.max_inline_bytes
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MultimodalAnalyzer for GeminiAnalyzer {
    async fn analyze_frame(&self, image: Bytes, prompt: &str) -> Result<String> {
        if image.is_empty() {
            return Err(LlmError::Provider("Empty image payload".to_string()));
        }
        self.check_inline_size(image.len())?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(&image);
        let parts = vec![
            json!({"text": prompt}),
            json!({"inline_data": {"mime_type": "image/jpeg", "data": encoded}}),
        ];
        debug!("Dispatching frame analysis ({} bytes)", image.len());
        self.generate(parts).await
    }

    async fn analyze_clip(
        &self,
        video: &Path,
        prompt: &str,
        fps: f32,
        start_sec: Option<f32>,
        end_sec: Option<f32>,
    ) -> Result<String> {
        let data = tokio::fs::read(video).await?;
        self.check_inline_size(data.len())?;

        let mut metadata = json!({"fps": fps});
        if let Some(start) = start_sec {
            metadata["start_offset"] = json!(format!("{}s", start));
        }
        if let Some(end) = end_sec {
            metadata["end_offset"] = json!(format!("{}s", end));
        }

        let encoded = base64::engine::general_purpose::STANDARD.encode(&data);
        let parts = vec![
            json!({"text": prompt}),
            json!({
                "inline_data": {"mime_type": "video/mp4", "data": encoded},
                "video_metadata": metadata,
            }),
        ];
        debug!("Dispatching clip analysis ({} bytes)", data.len());
        self.generate(parts).await
    }

    async fn analyze_remote_video(
        &self,
        url: &str,
        prompt: &str,
        timestamp_sec: Option<f32>,
    ) -> Result<String> {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(LlmError::Provider(format!("Invalid video URL: {}", url)));
        }

        let prompt = match timestamp_sec {
            Some(ts) => format!("{}\nFocus on the moment around {:.1}s.", prompt, ts),
            None => prompt.to_string(),
        };
        let parts = vec![
            json!({"text": prompt}),
            json!({"file_data": {"file_uri": url}}),
        ];
        debug!("Dispatching remote video analysis: {}", url);
        self.generate(parts).await
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Pull the guidance text out of a generateContent response
fn extract_text(json: &Value) -> Result<String> {
    let text = json["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .unwrap_or("")
        .to_string();
    if text.is_empty() {
        return Err(LlmError::InvalidResponse(
            "No text in provider response".to_string(),
        ));
    }
    Ok(text)
}
