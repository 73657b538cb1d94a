//! Queue bound and scheduler behavior tests

use async_trait::async_trait;
use bytes::Bytes;
use guidelens_core::{AgentProfile, AnalysisOutcome, AnalysisRequest, SessionMode};
use guidelens_llm::{LlmError, MultimodalAnalyzer};
use guidelens_session::{AnalysisQueue, SessionConfig, SessionEvent, SessionManager};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Recording mock for the remote analysis collaborator
#[derive(Default)]
struct MockAnalyzer {
    delay_ms: u64,
    scripted_failures: Mutex<VecDeque<String>>,
    dispatch_starts: Mutex<Vec<Instant>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl MockAnalyzer {
    fn with_delay(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Default::default()
        }
    }

    fn fail_next(&self, reason: &str) {
        self.scripted_failures
            .lock()
            .push_back(reason.to_string());
    }

    async fn run(&self, prompt: &str) -> guidelens_llm::Result<String> {
        self.dispatch_starts.lock().push(Instant::now());
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(reason) = self.scripted_failures.lock().pop_front() {
            return Err(LlmError::Provider(reason));
        }
        Ok(format!("ok: {}", prompt))
    }
}

#[async_trait]
impl MultimodalAnalyzer for MockAnalyzer {
    async fn analyze_frame(&self, _image: Bytes, prompt: &str) -> guidelens_llm::Result<String> {
        self.run(prompt).await
    }

    async fn analyze_clip(
        &self,
        _video: &Path,
        prompt: &str,
        _fps: f32,
        _start_sec: Option<f32>,
        _end_sec: Option<f32>,
    ) -> guidelens_llm::Result<String> {
        self.run(prompt).await
    }

    async fn analyze_remote_video(
        &self,
        _url: &str,
        prompt: &str,
        _timestamp_sec: Option<f32>,
    ) -> guidelens_llm::Result<String> {
        self.run(prompt).await
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

fn agent(id: &str) -> AgentProfile {
    AgentProfile::new(id, id, "test persona")
}

fn fast_config() -> SessionConfig {
    SessionConfig {
        min_request_interval_ms: 10,
        idle_poll_ms: 5,
        failure_backoff_ms: 20,
        ..Default::default()
    }
}

fn image() -> Bytes {
    Bytes::from_static(&[1u8; 32])
}

async fn wait_completions(events: &mut broadcast::Receiver<SessionEvent>, n: usize) {
    let mut seen = 0;
    while seen < n {
        match tokio::time::timeout(Duration::from_secs(10), events.recv()).await {
            Ok(Ok(SessionEvent::AnalysisCompleted(_))) => seen += 1,
            Ok(Ok(_)) => {}
            Ok(Err(e)) => panic!("Event stream closed: {}", e),
            Err(_) => panic!("Timed out waiting for {} completions (saw {})", n, seen),
        }
    }
}

#[test]
fn test_queue_retains_ten_newest_of_fifteen() {
    let queue = AnalysisQueue::new(10);
    for i in 0..15 {
        queue.enqueue(AnalysisRequest::frame(
            format!("r{}", i),
            agent("chef"),
            SessionMode::RealTime,
            image(),
            4,
            4,
        ));
        assert!(queue.len() <= 10);
    }
    assert_eq!(queue.len(), 10);

    let prompts: Vec<String> = std::iter::from_fn(|| queue.pop()).map(|r| r.prompt).collect();
    // Enqueue-order indices 0..4 were evicted
    for i in 0..5 {
        assert!(!prompts.contains(&format!("r{}", i)));
    }
    let expected: Vec<String> = (5..15).map(|i| format!("r{}", i)).collect();
    assert_eq!(prompts, expected);
}

#[tokio::test]
async fn test_at_most_one_request_in_flight() {
    let analyzer = Arc::new(MockAnalyzer::with_delay(50));
    let manager = SessionManager::new(fast_config(), analyzer.clone()).unwrap();
    let mut events = manager.subscribe_events();

    manager
        .start_session(agent("chef"), SessionMode::RealTime)
        .unwrap();
    for _ in 0..5 {
        manager.enqueue_frame(image(), 4, 4, None).unwrap();
    }

    wait_completions(&mut events, 5).await;
    assert_eq!(analyzer.max_in_flight.load(Ordering::SeqCst), 1);
    manager.stop_session();
}

#[tokio::test]
async fn test_dispatches_spaced_by_min_interval() {
    let analyzer = Arc::new(MockAnalyzer::with_delay(0));
    let config = SessionConfig {
        min_request_interval_ms: 200,
        idle_poll_ms: 5,
        ..Default::default()
    };
    let manager = SessionManager::new(config, analyzer.clone()).unwrap();
    let mut events = manager.subscribe_events();

    manager
        .start_session(agent("chef"), SessionMode::RealTime)
        .unwrap();
    for _ in 0..3 {
        manager.enqueue_frame(image(), 4, 4, None).unwrap();
    }
    wait_completions(&mut events, 3).await;

    let starts = analyzer.dispatch_starts.lock().clone();
    assert_eq!(starts.len(), 3);
    for pair in starts.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(
            gap >= Duration::from_millis(200),
            "Dispatch gap {:?} below minimum interval",
            gap
        );
    }
    manager.stop_session();
}

#[tokio::test]
async fn test_failed_request_recorded_and_loop_survives() {
    let analyzer = Arc::new(MockAnalyzer::with_delay(0));
    analyzer.fail_next("quota exceeded");
    let manager = SessionManager::new(fast_config(), analyzer.clone()).unwrap();
    let mut events = manager.subscribe_events();

    manager
        .start_session(agent("chef"), SessionMode::RealTime)
        .unwrap();
    manager.enqueue_frame(image(), 4, 4, None).unwrap();
    wait_completions(&mut events, 1).await;

    let history = manager.history();
    assert_eq!(history.len(), 1);
    match &history[0].outcome {
        AnalysisOutcome::Failed { reason } => assert!(reason.contains("quota exceeded")),
        other => panic!("Expected failure outcome, got {:?}", other),
    }
    // The failure is also the current analysis; observers always see the
    // most recent outcome regardless of success
    assert!(manager.current_analysis().unwrap().outcome.is_failure());

    // The loop is still alive and accepts further work
    manager.enqueue_frame(image(), 4, 4, None).unwrap();
    wait_completions(&mut events, 1).await;

    let history = manager.history();
    assert_eq!(history.len(), 2);
    assert!(matches!(
        history[0].outcome,
        AnalysisOutcome::Guidance { .. }
    ));
    manager.stop_session();
}

#[tokio::test]
async fn test_history_is_newest_first_and_bounded() {
    let analyzer = Arc::new(MockAnalyzer::with_delay(0));
    let config = SessionConfig {
        min_request_interval_ms: 0,
        idle_poll_ms: 5,
        history_limit: 3,
        ..Default::default()
    };
    let manager = SessionManager::new(config, analyzer.clone()).unwrap();
    let mut events = manager.subscribe_events();

    manager
        .start_session(agent("chef"), SessionMode::RealTime)
        .unwrap();
    for _ in 0..5 {
        manager.enqueue_frame(image(), 4, 4, None).unwrap();
    }
    wait_completions(&mut events, 5).await;

    let history = manager.history();
    assert_eq!(history.len(), 3);
    // Newest first: completion times never increase down the list
    for pair in history.windows(2) {
        assert!(pair[0].completed_at >= pair[1].completed_at);
    }
    manager.stop_session();
}
