//! guidelens-vision: camera capture for the GuideLens live session core
//!
//! Provides the video half of the capture pipeline:
//! - Exclusive camera ownership (one engine per camera per process)
//! - Front/back switching with atomic rebind
//! - Fps throttling for a bounded, predictable frame rate
//! - On-device per-frame metrics (brightness, sharpness, motion) computed
//!   without any remote call

pub mod analyzer;
pub mod camera;
pub mod config;
pub mod error;
pub mod frame;

pub use analyzer::{laplacian_variance, mean_luma, FrameAnalyzer};
pub use camera::{FrameCaptureEngine, FrameThrottle};
pub use config::{CameraFacing, CaptureTarget, VisionConfig};
pub use error::VisionError;
pub use frame::{DetectedObject, Frame, FrameMetrics};
