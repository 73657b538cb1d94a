//! Camera capture engine
//!
//! Exclusively owns the camera while a session is live: one engine instance
//! per camera resource per process. Frames flow through an fps throttle and
//! the on-device analyzer before being broadcast; slow subscribers lose old
//! frames rather than stalling the capture loop.

use crate::analyzer::FrameAnalyzer;
use crate::config::{CameraFacing, CaptureTarget, VisionConfig};
use crate::error::VisionError;
use crate::frame::{Frame, FrameMetrics};
use bytes::Bytes;
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::imgproc;
use opencv::videoio::{
    VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH,
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Drops frames that arrive faster than the target rate.
///
/// Level rule: a frame is accepted only if at least `1/target_fps` has
/// elapsed since the last accepted frame, giving a bounded production rate
/// regardless of the driver's cadence.
#[derive(Debug)]
pub struct FrameThrottle {
    interval: Duration,
    last_accepted: Option<Instant>,
}

impl FrameThrottle {
    pub fn new(target_fps: u32) -> Self {
        let fps = target_fps.max(1);
        Self {
            interval: Duration::from_secs_f64(1.0 / fps as f64),
            last_accepted: None,
        }
    }

    /// Whether a frame arriving at `now` should be processed
    pub fn accept(&mut self, now: Instant) -> bool {
        match self.last_accepted {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_accepted = Some(now);
                true
            }
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Camera capture engine
pub struct FrameCaptureEngine {
    config: Arc<RwLock<VisionConfig>>,
    capture: Arc<RwLock<Option<VideoCapture>>>,
    is_running: Arc<RwLock<bool>>,
    frame_tx: broadcast::Sender<Frame>,
    metrics_tx: broadcast::Sender<FrameMetrics>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl FrameCaptureEngine {
    /// Create a new engine. Does not touch the camera until `start`.
    pub fn new(config: VisionConfig) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;

        let (frame_tx, _) = broadcast::channel(config.broadcast_capacity);
        let (metrics_tx, _) = broadcast::channel(config.broadcast_capacity);
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            capture: Arc::new(RwLock::new(None)),
            is_running: Arc::new(RwLock::new(false)),
            frame_tx,
            metrics_tx,
            loop_handle: Mutex::new(None),
        })
    }

    /// Bind the camera at the given target and start the capture loop.
    ///
    /// `analyze` enables the on-device metric pipeline. Rebinding while
    /// active stops the previous binding first, so no camera handle leaks.
    pub fn start(&self, target: CaptureTarget, analyze: bool) -> Result<(), VisionError> {
        if *self.is_running.read() {
            self.stop();
        }

        {
            let mut config = self.config.write();
            config.resolution = target.resolution;
            config.target_fps = target.fps;
            config.validate().map_err(VisionError::Config)?;
        }

        let device = self.open_device()?;
        *self.capture.write() = Some(device);
        *self.is_running.write() = true;

        let config = self.config.clone();
        let capture = self.capture.clone();
        let is_running = self.is_running.clone();
        let frame_tx = self.frame_tx.clone();
        let metrics_tx = self.metrics_tx.clone();

        let handle = tokio::spawn(async move {
            let mut analyzer = FrameAnalyzer::new();
            let mut throttle = {
                let cfg = config.read();
                FrameThrottle::new(cfg.target_fps)
            };
            let poll_interval = throttle.interval() / 4;

            loop {
                if !*is_running.read() {
                    break;
                }

                let grabbed = {
                    let mut capture_guard = capture.write();
                    match capture_guard.as_mut() {
                        Some(cap) => {
                            let mut raw = Mat::default();
                            match cap.read(&mut raw) {
                                Ok(true) => Some(raw),
                                Ok(false) => None,
                                Err(e) => {
                                    error!("Camera read error: {}", e);
                                    None
                                }
                            }
                        }
                        // Mid-switch: the old device is released and the new
                        // one not yet bound
                        None => None,
                    }
                };

                let now = Instant::now();
                match grabbed {
                    Some(raw) if throttle.accept(now) => {
                        match luma_frame(&raw, now) {
                            Ok(frame) => {
                                if analyze {
                                    match analyzer.analyze(
                                        &frame.data,
                                        frame.width,
                                        frame.height,
                                        now,
                                    ) {
                                        Ok(metrics) => {
                                            if metrics_tx.send(metrics).is_err() {
                                                debug!("No metric subscribers, dropping");
                                            }
                                        }
                                        // Metric errors skip the frame's
                                        // metrics, never the loop
                                        Err(e) => warn!("Frame analysis error: {}", e),
                                    }
                                }
                                if frame_tx.send(frame).is_err() {
                                    debug!("No frame subscribers, dropping frame");
                                }
                            }
                            Err(e) => warn!("Frame conversion error: {}", e),
                        }
                    }
                    // Dropped by throttle or nothing read
                    _ => {}
                }

                tokio::time::sleep(poll_interval).await;
            }

            info!("Camera capture loop stopped");
        });

        *self.loop_handle.lock() = Some(handle);
        info!(
            "Camera capture started (device {})",
            self.config.read().device_id()
        );
        Ok(())
    }

    /// Toggle front/back camera, rebinding atomically: the old device is
    /// fully released before the new one is acquired.
    pub fn switch_facing(&self) -> Result<CameraFacing, VisionError> {
        let new_facing = {
            let mut config = self.config.write();
            config.facing = config.facing.toggled();
            config.facing
        };

        if *self.is_running.read() {
            // Release first; the capture loop sees None and idles briefly
            drop(self.capture.write().take());
            let device = self.open_device()?;
            *self.capture.write() = Some(device);
        }

        info!("Camera switched to {:?}", new_facing);
        Ok(new_facing)
    }

    /// Unbind the camera and stop the loop. Idempotent.
    pub fn stop(&self) {
        {
            let mut is_running = self.is_running.write();
            if !*is_running {
                return;
            }
            *is_running = false;
        }
        if let Some(handle) = self.loop_handle.lock().take() {
            handle.abort();
        }
        drop(self.capture.write().take());
        info!("Camera capture stopped");
    }

    pub fn is_running(&self) -> bool {
        *self.is_running.read()
    }

    pub fn facing(&self) -> CameraFacing {
        self.config.read().facing
    }

    pub fn subscribe_frames(&self) -> broadcast::Receiver<Frame> {
        self.frame_tx.subscribe()
    }

    pub fn subscribe_metrics(&self) -> broadcast::Receiver<FrameMetrics> {
        self.metrics_tx.subscribe()
    }

    /// Open the device for the active facing and apply resolution/fps
    fn open_device(&self) -> Result<VideoCapture, VisionError> {
        let config = self.config.read().clone();
        let device_id = config.device_id();

        let mut capture = VideoCapture::new(device_id as i32, CAP_ANY).map_err(|e| {
            VisionError::Camera(format!("Failed to open camera {}: {}", device_id, e))
        })?;

        let opened = capture
            .is_opened()
            .map_err(|e| VisionError::Camera(format!("Camera {} not opened: {}", device_id, e)))?;
        if !opened {
            return Err(VisionError::Camera(format!(
                "Camera {} failed to open",
                device_id
            )));
        }

        capture
            .set(CAP_PROP_FRAME_WIDTH, config.resolution.0 as f64)
            .map_err(|e| VisionError::Camera(format!("Failed to set width: {}", e)))?;
        capture
            .set(CAP_PROP_FRAME_HEIGHT, config.resolution.1 as f64)
            .map_err(|e| VisionError::Camera(format!("Failed to set height: {}", e)))?;
        capture
            .set(CAP_PROP_FPS, config.target_fps as f64)
            .map_err(|e| VisionError::Camera(format!("Failed to set FPS: {}", e)))?;

        Ok(capture)
    }
}

impl Drop for FrameCaptureEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Convert a BGR capture frame to an 8-bit luma `Frame`
fn luma_frame(raw: &Mat, captured_at: Instant) -> Result<Frame, VisionError> {
    let mut gray = Mat::default();
    if raw.channels() == 1 {
        raw.copy_to(&mut gray)?;
    } else {
        imgproc::cvt_color(raw, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;
    }

    let width = gray.cols() as u32;
    let height = gray.rows() as u32;
    let data = gray.data_bytes()?;
    Ok(Frame {
        data: Bytes::copy_from_slice(data),
        width,
        height,
        captured_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_accepts_first_frame() {
        let mut throttle = FrameThrottle::new(10);
        assert!(throttle.accept(Instant::now()));
    }

    #[test]
    fn test_throttle_drops_early_frames() {
        let mut throttle = FrameThrottle::new(10); // 100 ms interval
        let start = Instant::now();
        assert!(throttle.accept(start));
        assert!(!throttle.accept(start + Duration::from_millis(50)));
        assert!(!throttle.accept(start + Duration::from_millis(99)));
        assert!(throttle.accept(start + Duration::from_millis(100)));
    }

    #[test]
    fn test_throttle_interval_from_last_accepted_not_last_seen() {
        let mut throttle = FrameThrottle::new(10);
        let start = Instant::now();
        assert!(throttle.accept(start));
        // A dropped frame must not push the window forward
        assert!(!throttle.accept(start + Duration::from_millis(60)));
        assert!(throttle.accept(start + Duration::from_millis(110)));
    }

    #[test]
    fn test_throttle_zero_fps_clamped() {
        let throttle = FrameThrottle::new(0);
        assert_eq!(throttle.interval(), Duration::from_secs(1));
    }
}
