//! Session identifiers and modes

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the session feeds the analysis pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionMode {
    /// Continuous capture feeds analysis requests implicitly
    RealTime,
    /// Guided multi-step session; analysis on step transitions
    StepByStep,
    /// Analysis only on explicit user action
    OnDemand,
}

impl SessionMode {
    /// Short label used in rendered prompts and history entries
    pub fn label(&self) -> &'static str {
        match self {
            SessionMode::RealTime => "real-time",
            SessionMode::StepByStep => "step-by-step",
            SessionMode::OnDemand => "on-demand",
        }
    }
}
