//! guidelens-audio: microphone capture for the GuideLens live session core
//!
//! Provides the audio half of the capture pipeline:
//! - Exclusive microphone ownership (one engine per device per process)
//! - Fixed-duration 16-bit PCM chunking at 16 kHz
//! - Per-chunk RMS volume and quality classification
//! - Lossy broadcast publication so slow subscribers never stall capture
//! - Pause/resume without releasing the device, for turn-taking

pub mod capture;
pub mod chunk;
pub mod config;
pub mod error;
pub mod level;

pub use capture::AudioCaptureEngine;
pub use chunk::{f32_to_i16, AudioChunk, AudioChunker};
pub use config::{AudioConfig, LevelConfig};
pub use error::AudioError;
pub use level::{clipping_ratio, rms_volume, AudioLevel, AudioQuality, LevelMeter};
