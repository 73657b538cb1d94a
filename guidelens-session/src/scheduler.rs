//! Single-consumer analysis scheduler
//!
//! The remote collaborator has no concurrency contract, so every request
//! flows through one loop: dequeue, enforce inter-request spacing, dispatch,
//! record. The loop survives request failures and internal faults; only
//! session cancellation ends it.

use crate::config::SessionConfig;
use crate::queue::AnalysisQueue;
use crate::state::{SessionEvent, SessionSnapshot};
use chrono::Utc;
use futures_util::FutureExt;
use guidelens_core::{
    AnalysisHistory, AnalysisOutcome, AnalysisPayload, AnalysisRequest, HistoryEntry,
};
use guidelens_llm::MultimodalAnalyzer;
use parking_lot::RwLock;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

/// State shared between the session manager, the scheduler loop and
/// observers. Single writer per field; observers read snapshots.
pub(crate) struct SessionShared {
    pub config: SessionConfig,
    pub queue: AnalysisQueue,
    pub history: RwLock<AnalysisHistory>,
    pub current: RwLock<Option<HistoryEntry>>,
    pub snapshot: RwLock<SessionSnapshot>,
    pub events: broadcast::Sender<SessionEvent>,
    /// Bumped on every session start/stop; loops tagged with an older value
    /// must not write results
    pub generation: AtomicU64,
}

impl SessionShared {
    pub fn new(config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            queue: AnalysisQueue::new(config.queue_bound),
            history: RwLock::new(AnalysisHistory::new(config.history_limit)),
            current: RwLock::new(None),
            snapshot: RwLock::new(SessionSnapshot::idle()),
            events,
            generation: AtomicU64::new(0),
            config,
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.current_generation() != generation
    }

    pub fn emit_state(&self) {
        let snapshot = self.snapshot.read().clone();
        if self.events.send(SessionEvent::StateChanged(snapshot)).is_err() {
            debug!("No session event subscribers");
        }
    }

    fn set_processing(&self, generation: u64, processing: bool) {
        if self.is_stale(generation) {
            return;
        }
        self.snapshot.write().processing = processing;
        self.emit_state();
    }

    /// Record a completed analysis unless the owning session is gone
    fn record(&self, generation: u64, entry: HistoryEntry) {
        if self.is_stale(generation) {
            debug!("Discarding analysis result from stopped session");
            return;
        }
        self.history.write().record(entry.clone());
        *self.current.write() = Some(entry.clone());
        if self.events.send(SessionEvent::AnalysisCompleted(entry)).is_err() {
            debug!("No session event subscribers");
        }
    }
}

/// Run the scheduler loop for one session generation.
///
/// Exits when `cancelled` is set. An in-flight remote call is allowed to
/// finish; its result is discarded by the generation guard if the session
/// was stopped meanwhile.
pub(crate) async fn run_scheduler(
    shared: Arc<SessionShared>,
    analyzer: Arc<dyn MultimodalAnalyzer>,
    generation: u64,
    cancelled: Arc<AtomicBool>,
) {
    let idle_poll = Duration::from_millis(shared.config.idle_poll_ms);
    let backoff = Duration::from_millis(shared.config.failure_backoff_ms);
    let mut last_completed: Option<Instant> = None;

    loop {
        if cancelled.load(Ordering::Acquire) {
            break;
        }

        let step = AssertUnwindSafe(process_next(
            &shared,
            analyzer.as_ref(),
            generation,
            &mut last_completed,
        ))
        .catch_unwind()
        .await;

        match step {
            Ok(true) => {}
            Ok(false) => tokio::time::sleep(idle_poll).await,
            Err(_) => {
                // Internal fault: never kill the loop over one iteration
                error!("Scheduler iteration panicked, backing off");
                tokio::time::sleep(backoff).await;
            }
        }
    }
    debug!("Scheduler loop for generation {} exited", generation);
}

/// Process at most one request. Returns false when the queue was idle.
async fn process_next(
    shared: &Arc<SessionShared>,
    analyzer: &dyn MultimodalAnalyzer,
    generation: u64,
    last_completed: &mut Option<Instant>,
) -> bool {
    let Some(request) = shared.queue.pop() else {
        return false;
    };

    // Rate-limit guard: space dispatches from the previous completion so a
    // slow remote call never causes a burst afterwards
    if let Some(last) = *last_completed {
        let min_interval = Duration::from_millis(shared.config.min_request_interval_ms);
        let elapsed = last.elapsed();
        if elapsed < min_interval {
            tokio::time::sleep(min_interval - elapsed).await;
        }
    }

    shared.set_processing(generation, true);
    let started = Instant::now();
    let outcome = dispatch(analyzer, &request).await;
    let duration = started.elapsed();
    *last_completed = Some(Instant::now());

    let entry = HistoryEntry {
        outcome,
        agent_id: request.agent.id.clone(),
        mode: request.mode,
        request_kind: request.kind(),
        completed_at: Utc::now(),
        duration,
    };
    shared.record(generation, entry);
    shared.set_processing(generation, false);
    true
}

/// Dispatch one request to the collaborator; failures become outcomes
async fn dispatch(analyzer: &dyn MultimodalAnalyzer, request: &AnalysisRequest) -> AnalysisOutcome {
    let result = match &request.payload {
        AnalysisPayload::Frame { image, .. } => {
            analyzer.analyze_frame(image.clone(), &request.prompt).await
        }
        AnalysisPayload::Clip {
            path,
            fps,
            start_sec,
            end_sec,
        } => {
            analyzer
                .analyze_clip(path, &request.prompt, *fps, *start_sec, *end_sec)
                .await
        }
        AnalysisPayload::RemoteVideo { url, timestamp_sec } => {
            analyzer
                .analyze_remote_video(url, &request.prompt, *timestamp_sec)
                .await
        }
    };

    match result {
        Ok(text) => AnalysisOutcome::Guidance { text },
        Err(e) => {
            warn!("Remote analysis failed: {}", e);
            AnalysisOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}
