//! Implicit queue feeding for real-time sessions
//!
//! In real-time mode the analysis queue is fed by frame emission itself,
//! not by user action. The feeder samples the (already fps-throttled)
//! frame stream down to an analysis cadence; overload beyond that is
//! handled by the queue's drop-oldest policy.

use crate::manager::SessionManager;
use guidelens_core::SessionMode;
use guidelens_vision::Frame;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Forward frames into the analysis queue while the session is live in
/// real-time mode. Returns when the frame stream closes.
///
/// Lagging behind the camera is harmless: missed frames are skipped, and
/// the next received frame is as current as any.
pub async fn run_realtime_feeder(
    manager: Arc<SessionManager>,
    mut frames: broadcast::Receiver<Frame>,
    min_spacing: Duration,
) {
    let mut last_fed: Option<Instant> = None;
    loop {
        match frames.recv().await {
            Ok(frame) => {
                let snapshot = manager.snapshot();
                if !snapshot.lifecycle.is_active() || snapshot.mode != Some(SessionMode::RealTime)
                {
                    continue;
                }
                if let Some(last) = last_fed {
                    if last.elapsed() < min_spacing {
                        continue;
                    }
                }
                last_fed = Some(Instant::now());
                if let Err(e) =
                    manager.enqueue_frame(frame.data.clone(), frame.width, frame.height, None)
                {
                    // Session stopped between the snapshot and the enqueue
                    warn!("Dropping frame, enqueue failed: {}", e);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Feeder lagged behind camera, skipped {} frames", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("Frame stream closed, feeder exiting");
}
