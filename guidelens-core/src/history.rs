//! Analysis outcomes and the bounded result history

use crate::session::SessionMode;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;

/// What the remote collaborator produced for one request.
///
/// Failures are ordinary outcomes: sporadic AI-API errors are expected and
/// recorded in history like any success.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Guidance { text: String },
    Failed { reason: String },
}

impl AnalysisOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, AnalysisOutcome::Failed { .. })
    }
}

/// One completed analysis, as observed by the UI
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub outcome: AnalysisOutcome,
    pub agent_id: String,
    pub mode: SessionMode,
    /// Payload variant label ("frame", "clip", "remote-video")
    pub request_kind: &'static str,
    pub completed_at: DateTime<Utc>,
    /// Wall-clock time the remote call took
    pub duration: Duration,
}

/// Bounded, newest-first sequence of completed analyses.
///
/// Owned by the scheduler; read-only to observers. Oldest entries are
/// evicted once the cap is reached.
#[derive(Debug)]
pub struct AnalysisHistory {
    entries: VecDeque<HistoryEntry>,
    max_entries: usize,
}

impl AnalysisHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(64)),
            max_entries,
        }
    }

    /// Record a completed analysis as the newest entry
    pub fn record(&mut self, entry: HistoryEntry) {
        if self.max_entries == 0 {
            return;
        }
        if self.entries.len() == self.max_entries {
            self.entries.pop_back();
        }
        self.entries.push_front(entry);
    }

    /// Newest entry, if any
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    /// Entries newest-first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Snapshot of the entries, newest-first
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
