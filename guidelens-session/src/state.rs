//! Session lifecycle state and observable events

use guidelens_core::{AgentProfile, HistoryEntry, SessionId, SessionMode};

/// Session lifecycle.
///
/// Transitions are monotonic per session instance:
/// Idle -> Starting -> Active -> {Idle, Error}. A session never leaves
/// Error without a fresh start.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionLifecycle {
    Idle,
    Starting,
    Active,
    Error(String),
}

impl SessionLifecycle {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionLifecycle::Active)
    }
}

/// Point-in-time view of the session, published to observers
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub lifecycle: SessionLifecycle,
    pub id: Option<SessionId>,
    pub agent: Option<AgentProfile>,
    pub mode: Option<SessionMode>,
    /// A request is currently being dispatched to the remote collaborator
    pub processing: bool,
}

impl SessionSnapshot {
    pub fn idle() -> Self {
        Self {
            lifecycle: SessionLifecycle::Idle,
            id: None,
            agent: None,
            mode: None,
            processing: false,
        }
    }
}

/// Events published on the session broadcast channel
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionSnapshot),
    AnalysisCompleted(HistoryEntry),
}
