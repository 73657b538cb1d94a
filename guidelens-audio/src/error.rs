//! Error types for guidelens-audio

use guidelens_core::Error as CoreError;
use thiserror::Error;

/// Audio capture and metering errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Audio capture error: {0}")]
    Capture(String),

    #[error("Audio format error: {0}")]
    Format(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AudioError> for CoreError {
    fn from(err: AudioError) -> Self {
        CoreError::Capture(format!("Audio error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_display() {
        let err = AudioError::Device("no input device".to_string());
        assert!(err.to_string().contains("Audio device error"));
        assert!(err.to_string().contains("no input device"));
    }

    #[test]
    fn test_audio_error_to_core_error() {
        let err = AudioError::Capture("stream died".to_string());
        let core: CoreError = err.into();
        match core {
            CoreError::Capture(msg) => assert!(msg.contains("stream died")),
            _ => panic!("Expected Capture error"),
        }
    }
}
