//! Session manager: the lifecycle state machine and command surface
//!
//! One manager instance per device session; at most one live session at a
//! time. The manager is the single writer of session state — capture
//! engines and UI observe it through snapshots and the event stream.

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::scheduler::{run_scheduler, SessionShared};
use crate::state::{SessionEvent, SessionLifecycle, SessionSnapshot};
use bytes::Bytes;
use guidelens_core::{AgentProfile, AnalysisRequest, HistoryEntry, SessionId, SessionMode};
use guidelens_llm::MultimodalAnalyzer;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct SessionManager {
    shared: Arc<SessionShared>,
    analyzer: Arc<dyn MultimodalAnalyzer>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
    cancel_flag: Mutex<Option<Arc<AtomicBool>>>,
}

impl SessionManager {
    pub fn new(
        config: SessionConfig,
        analyzer: Arc<dyn MultimodalAnalyzer>,
    ) -> Result<Self, SessionError> {
        config.validate().map_err(SessionError::Config)?;
        Ok(Self {
            shared: Arc::new(SessionShared::new(config)),
            analyzer,
            loop_handle: Mutex::new(None),
            cancel_flag: Mutex::new(None),
        })
    }

    /// Start a session for the given persona and mode.
    ///
    /// If a session is already live it is fully stopped first — its loop
    /// cancelled and its queue drained — so two scheduler loops never run
    /// at once.
    pub fn start_session(
        &self,
        agent: AgentProfile,
        mode: SessionMode,
    ) -> Result<SessionId, SessionError> {
        if !matches!(self.shared.snapshot.read().lifecycle, SessionLifecycle::Idle) {
            warn!("Starting session over a live one; stopping previous session");
            self.stop_session();
        }

        let generation = self
            .shared
            .generation
            .fetch_add(1, Ordering::AcqRel)
            .wrapping_add(1);
        let id = SessionId::generate();

        {
            let mut snapshot = self.shared.snapshot.write();
            *snapshot = SessionSnapshot {
                lifecycle: SessionLifecycle::Starting,
                id: Some(id.clone()),
                agent: Some(agent.clone()),
                mode: Some(mode),
                processing: false,
            };
        }
        self.shared.emit_state();

        // Fresh session: nothing from any previous one may remain visible
        self.shared.queue.clear();
        self.shared.history.write().clear();
        *self.shared.current.write() = None;

        let cancelled = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(run_scheduler(
            self.shared.clone(),
            self.analyzer.clone(),
            generation,
            cancelled.clone(),
        ));
        *self.cancel_flag.lock() = Some(cancelled);
        *self.loop_handle.lock() = Some(handle);

        self.shared.snapshot.write().lifecycle = SessionLifecycle::Active;
        self.shared.emit_state();
        info!(
            "Session {} started: agent={} mode={}",
            id,
            agent.id,
            mode.label()
        );
        Ok(id)
    }

    /// Stop the live session: cancel the scheduler loop, drain the queue,
    /// clear the current analysis. Idempotent.
    ///
    /// An in-flight remote call is not aborted; the generation bump below
    /// guarantees its result is discarded instead of leaking into a later
    /// session.
    pub fn stop_session(&self) {
        // Invalidate any in-flight result before anything else
        self.shared.generation.fetch_add(1, Ordering::AcqRel);

        if let Some(cancelled) = self.cancel_flag.lock().take() {
            cancelled.store(true, Ordering::Release);
        }
        // Cooperative: the loop exits at its next cancellation check; the
        // detached handle is simply forgotten
        let _ = self.loop_handle.lock().take();

        self.shared.queue.clear();
        *self.shared.current.write() = None;
        let was_live = {
            let mut snapshot = self.shared.snapshot.write();
            let was_live = !matches!(snapshot.lifecycle, SessionLifecycle::Idle);
            *snapshot = SessionSnapshot::idle();
            was_live
        };
        if was_live {
            self.shared.emit_state();
            info!("Session stopped");
        }
    }

    /// Switch mode in place. Does not restart the scheduler loop.
    pub fn switch_mode(&self, mode: SessionMode) -> Result<(), SessionError> {
        {
            let mut snapshot = self.shared.snapshot.write();
            if !snapshot.lifecycle.is_active() {
                return Err(SessionError::State(
                    "Cannot switch mode without an active session".to_string(),
                ));
            }
            snapshot.mode = Some(mode);
        }
        self.shared.emit_state();
        debug!("Session mode switched to {}", mode.label());
        Ok(())
    }

    /// Record an unrecoverable fault. The session must be explicitly
    /// restarted with `start_session`; there is no automatic retry.
    pub fn fail_session(&self, reason: &str) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(cancelled) = self.cancel_flag.lock().take() {
            cancelled.store(true, Ordering::Release);
        }
        *self.loop_handle.lock() = None;
        self.shared.queue.clear();
        {
            let mut snapshot = self.shared.snapshot.write();
            snapshot.lifecycle = SessionLifecycle::Error(reason.to_string());
            snapshot.processing = false;
        }
        self.shared.emit_state();
        warn!("Session failed: {}", reason);
    }

    /// Queue a frame for analysis
    pub fn enqueue_frame(
        &self,
        image: Bytes,
        width: u32,
        height: u32,
        user_note: Option<&str>,
    ) -> Result<(), SessionError> {
        let (agent, mode) = self.live_context()?;
        let prompt = agent.render_prompt(mode, user_note);
        self.submit(AnalysisRequest::frame(prompt, agent, mode, image, width, height))
    }

    /// Queue a local video clip for analysis
    pub fn enqueue_clip(
        &self,
        path: PathBuf,
        fps: f32,
        start_sec: Option<f32>,
        end_sec: Option<f32>,
        user_note: Option<&str>,
    ) -> Result<(), SessionError> {
        let (agent, mode) = self.live_context()?;
        let prompt = agent.render_prompt(mode, user_note);
        self.submit(AnalysisRequest::clip(
            prompt, agent, mode, path, fps, start_sec, end_sec,
        ))
    }

    /// Queue a remotely hosted video for analysis
    pub fn enqueue_remote_video(
        &self,
        url: String,
        timestamp_sec: Option<f32>,
        user_note: Option<&str>,
    ) -> Result<(), SessionError> {
        let (agent, mode) = self.live_context()?;
        let prompt = agent.render_prompt(mode, user_note);
        self.submit(AnalysisRequest::remote_video(
            prompt,
            agent,
            mode,
            url,
            timestamp_sec,
        ))
    }

    /// Current session snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshot.read().clone()
    }

    /// Subscribe to state changes and completed analyses
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Latest analysis outcome, success or failure
    pub fn current_analysis(&self) -> Option<HistoryEntry> {
        self.shared.current.read().clone()
    }

    /// Completed analyses, newest-first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.shared.history.read().snapshot()
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn is_active(&self) -> bool {
        self.shared.snapshot.read().lifecycle.is_active()
    }

    fn live_context(&self) -> Result<(AgentProfile, SessionMode), SessionError> {
        let snapshot = self.shared.snapshot.read();
        if !snapshot.lifecycle.is_active() {
            return Err(SessionError::State(
                "Cannot enqueue analysis without an active session".to_string(),
            ));
        }
        match (&snapshot.agent, snapshot.mode) {
            (Some(agent), Some(mode)) => Ok((agent.clone(), mode)),
            _ => Err(SessionError::State(
                "Active session is missing agent or mode".to_string(),
            )),
        }
    }

    fn submit(&self, request: AnalysisRequest) -> Result<(), SessionError> {
        if let Some(evicted) = self.shared.queue.enqueue(request) {
            debug!(
                "Queue full, evicted oldest pending {} request",
                evicted.kind()
            );
        }
        Ok(())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop_session();
    }
}
