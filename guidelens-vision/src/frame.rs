//! Frame and per-frame metric types

use bytes::Bytes;
use std::time::Instant;

/// A single accepted camera frame, as 8-bit luma
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub captured_at: Instant,
}

/// Object detected in a frame. Extension point: the base pipeline emits an
/// empty list; a detector can be layered on later without changing the
/// metric stream.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedObject {
    pub label: String,
    pub confidence: f32,
}

/// Lightweight on-device metrics computed per accepted frame
#[derive(Debug, Clone)]
pub struct FrameMetrics {
    pub captured_at: Instant,
    /// Mean luma, normalized to [0, 1]
    pub brightness: f32,
    /// Laplacian-variance approximation over a subsampled grid
    pub sharpness: f32,
    /// Frame-to-frame brightness delta normalized by elapsed time, [0, 1]
    pub motion: f32,
    pub objects: Vec<DetectedObject>,
}
