//! Configuration for audio capture and metering

use serde::{Deserialize, Serialize};

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Device name (None = default input device)
    pub device_name: Option<String>,

    /// Sample rate in Hz. The conversational upstream expects 16 kHz.
    pub sample_rate: u32,

    /// Number of channels (mono for the conversational stream)
    pub channels: u16,

    /// Duration of one emitted chunk in milliseconds
    pub chunk_duration_ms: u64,

    /// Broadcast capacity for chunk subscribers. Slow subscribers lag and
    /// lose old chunks instead of stalling the capture callback.
    pub broadcast_capacity: usize,

    /// Level metering thresholds
    pub levels: LevelConfig,
}

/// Thresholds for volume/quality classification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Normalized RMS below this is too quiet to be usable
    pub silence_floor: f32,

    /// Normalized RMS below this is marginal
    pub quiet_threshold: f32,

    /// Normalized RMS range considered ideal: [ideal_min, ideal_max]
    pub ideal_min: f32,
    pub ideal_max: f32,

    /// Fraction of clipped samples above which quality is Poor
    pub max_clipping_ratio: f32,

    /// Normalized RMS above which the user counts as speaking
    pub speaking_threshold: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            sample_rate: 16_000,
            channels: 1,
            chunk_duration_ms: 100,
            broadcast_capacity: 64,
            levels: LevelConfig::default(),
        }
    }
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            silence_floor: 0.01,
            quiet_threshold: 0.04,
            ideal_min: 0.10,
            ideal_max: 0.70,
            max_clipping_ratio: 0.02,
            speaking_threshold: 0.05,
        }
    }
}

impl AudioConfig {
    /// Number of samples in one chunk
    pub fn chunk_samples(&self) -> usize {
        (self.sample_rate as u64 * self.chunk_duration_ms / 1000) as usize
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 || self.sample_rate > 192_000 {
            return Err("Sample rate must be between 1 and 192000".to_string());
        }
        if self.channels == 0 || self.channels > 2 {
            return Err("Channels must be 1 or 2".to_string());
        }
        if self.chunk_duration_ms == 0 || self.chunk_duration_ms > 1000 {
            return Err("Chunk duration must be between 1 and 1000 ms".to_string());
        }
        if self.broadcast_capacity == 0 {
            return Err("Broadcast capacity must be non-zero".to_string());
        }
        if let Some(ref name) = self.device_name {
            if name.len() > 256 {
                return Err("Device name too long (max 256 chars)".to_string());
            }
        }
        self.levels.validate()
    }
}

impl LevelConfig {
    pub fn validate(&self) -> Result<(), String> {
        let ordered = self.silence_floor >= 0.0
            && self.silence_floor < self.quiet_threshold
            && self.quiet_threshold < self.ideal_min
            && self.ideal_min < self.ideal_max
            && self.ideal_max <= 1.0;
        if !ordered {
            return Err(
                "Level thresholds must satisfy 0 <= silence < quiet < ideal_min < ideal_max <= 1"
                    .to_string(),
            );
        }
        if !(0.0..=1.0).contains(&self.max_clipping_ratio) {
            return Err("Clipping ratio must be within [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.speaking_threshold) {
            return Err("Speaking threshold must be within [0, 1]".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_valid() {
        let config = AudioConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_rate, 16_000);
        assert_eq!(config.channels, 1);
        // 100 ms at 16 kHz
        assert_eq!(config.chunk_samples(), 1600);
    }

    #[test]
    fn test_config_rejects_zero_sample_rate() {
        let config = AudioConfig {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_bad_chunk_duration() {
        let config = AudioConfig {
            chunk_duration_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AudioConfig {
            chunk_duration_ms: 5000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_level_config_ordering_enforced() {
        let levels = LevelConfig {
            quiet_threshold: 0.005,
            ..Default::default()
        };
        assert!(levels.validate().is_err());
    }
}
