//! Multimodal analysis provider trait
//!
//! The scheduler treats the provider as a single-slot resource: calls are
//! awaited one at a time and never issued concurrently. Implementations do
//! not need to be re-entrant.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

/// A remote collaborator that can interpret frames and video
#[async_trait]
pub trait MultimodalAnalyzer: Send + Sync {
    /// Interpret a single captured frame
    async fn analyze_frame(&self, image: Bytes, prompt: &str) -> Result<String>;

    /// Interpret a local video clip sampled at `fps` over an optional range
    async fn analyze_clip(
        &self,
        video: &Path,
        prompt: &str,
        fps: f32,
        start_sec: Option<f32>,
        end_sec: Option<f32>,
    ) -> Result<String>;

    /// Interpret a remotely hosted video around an optional timestamp
    async fn analyze_remote_video(
        &self,
        url: &str,
        prompt: &str,
        timestamp_sec: Option<f32>,
    ) -> Result<String>;

    fn name(&self) -> &'static str;
}
