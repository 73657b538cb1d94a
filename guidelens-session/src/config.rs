//! Session and scheduler configuration
//!
//! The queue bound and inter-request interval were tuned against one
//! specific remote API's quota behavior; they are configuration rather than
//! constants so other deployments can adjust them.

use serde::{Deserialize, Serialize};

/// Session pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum pending analysis requests. Enqueueing beyond this evicts the
    /// oldest pending request (drop-oldest backpressure).
    pub queue_bound: usize,

    /// Minimum spacing between remote dispatches, measured from the
    /// previous request's completion, in milliseconds.
    pub min_request_interval_ms: u64,

    /// How long the scheduler idles when the queue is empty, in
    /// milliseconds.
    pub idle_poll_ms: u64,

    /// Backoff after an unexpected scheduler fault, in milliseconds.
    pub failure_backoff_ms: u64,

    /// Maximum retained history entries (newest-first, oldest evicted).
    pub history_limit: usize,

    /// Broadcast capacity for session event subscribers.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queue_bound: 10,
            min_request_interval_ms: 2000,
            idle_poll_ms: 200,
            failure_backoff_ms: 1000,
            history_limit: 50,
            event_capacity: 64,
        }
    }
}

impl SessionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.queue_bound == 0 {
            return Err("Queue bound must be non-zero".to_string());
        }
        if self.idle_poll_ms == 0 {
            return Err("Idle poll interval must be non-zero".to_string());
        }
        if self.failure_backoff_ms == 0 {
            return Err("Failure backoff must be non-zero".to_string());
        }
        if self.event_capacity == 0 {
            return Err("Event capacity must be non-zero".to_string());
        }
        Ok(())
    }
}
