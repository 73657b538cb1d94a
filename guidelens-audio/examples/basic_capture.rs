//! Basic audio capture example
//! Captures five seconds of microphone audio and prints level updates

use guidelens_audio::{AudioCaptureEngine, AudioConfig};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = AudioConfig::default();
    config
        .validate()
        .map_err(|e| format!("Invalid audio config: {}", e))?;

    let engine = AudioCaptureEngine::new(config)?;
    let mut levels = engine.subscribe_levels();

    engine.start()?;
    info!("Recording for 5 seconds...");

    let reader = tokio::spawn(async move {
        while let Ok(level) = levels.recv().await {
            info!(
                "volume={:.3} clipping={:.3} quality={:?}",
                level.volume, level.clipping_ratio, level.quality
            );
        }
    });

    sleep(Duration::from_secs(5)).await;

    match engine.stop() {
        Some(buffer) => info!("Recorded {} bytes of PCM", buffer.len()),
        None => warn!("Nothing recorded"),
    }
    reader.abort();
    Ok(())
}
