//! Live session example
//! Starts a real-time session and queues a remote video for analysis

use guidelens_core::AgentRegistry;
use guidelens_core::SessionMode;
use guidelens_llm::{GeminiAnalyzer, ProviderConfig};
use guidelens_session::{SessionConfig, SessionEvent, SessionManager};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let api_key = std::env::var("GEMINI_API_KEY")
        .map_err(|_| "Set GEMINI_API_KEY to run this example")?;
    let analyzer = Arc::new(GeminiAnalyzer::with_api_key(
        ProviderConfig::default(),
        api_key,
    )?);

    let registry = AgentRegistry::builtin();
    let chef = registry.get("chef")?.clone();

    let manager = SessionManager::new(SessionConfig::default(), analyzer)?;
    let mut events = manager.subscribe_events();

    manager.start_session(chef, SessionMode::RealTime)?;
    manager.enqueue_remote_video(
        "https://storage.googleapis.com/cloud-samples-data/video/animals.mp4".to_string(),
        Some(5.0),
        Some("what animal is on screen?"),
    )?;

    let watcher = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::AnalysisCompleted(entry) => {
                    info!("Analysis completed: {:?}", entry.outcome)
                }
                SessionEvent::StateChanged(snapshot) => {
                    info!("Session state: {:?}", snapshot.lifecycle)
                }
            }
        }
    });

    sleep(Duration::from_secs(30)).await;
    manager.stop_session();
    watcher.abort();
    Ok(())
}
