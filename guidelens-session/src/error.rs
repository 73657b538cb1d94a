//! Error types for guidelens-session

use guidelens_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session state error: {0}")]
    State(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<SessionError> for CoreError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Core(core) => core,
            other => CoreError::Session(other.to_string()),
        }
    }
}
