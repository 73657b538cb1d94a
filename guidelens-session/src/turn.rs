//! Turn coordination between user speech and AI playback
//!
//! Prevents the microphone from feeding the conversational upstream while
//! AI audio is playing back, and resumes listening once playback ends and
//! the user is not already speaking.

use guidelens_audio::{AudioCaptureEngine, AudioLevel};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Gate over the microphone's upstream flow.
///
/// Both operations must be idempotent: the coordinator's policy is level
/// triggered and re-applies on every tick.
pub trait MicrophoneControl: Send + Sync {
    /// Resume feeding microphone audio upstream
    fn open_mic(&self);
    /// Cut the upstream feed immediately (hard interrupt, no drain)
    fn close_mic(&self);
    fn is_open(&self) -> bool;
}

/// The capture engine gates upstream flow by pausing: the device stays
/// open, so resuming after AI playback is glitch-free.
impl MicrophoneControl for AudioCaptureEngine {
    fn open_mic(&self) {
        self.resume();
    }

    fn close_mic(&self) {
        self.pause();
    }

    fn is_open(&self) -> bool {
        self.is_recording()
    }
}

/// Level-triggered turn policy
pub struct TurnCoordinator {
    mic: Arc<dyn MicrophoneControl>,
    ai_playing: AtomicBool,
    user_speaking: AtomicBool,
}

impl TurnCoordinator {
    pub fn new(mic: Arc<dyn MicrophoneControl>) -> Self {
        Self {
            mic,
            ai_playing: AtomicBool::new(false),
            user_speaking: AtomicBool::new(false),
        }
    }

    /// AI TTS playback started or stopped
    pub fn set_ai_playing(&self, playing: bool) {
        self.ai_playing.store(playing, Ordering::Release);
        self.evaluate();
    }

    /// Live volume crossed (or fell below) the speaking threshold
    pub fn set_user_speaking(&self, speaking: bool) {
        self.user_speaking.store(speaking, Ordering::Release);
        self.evaluate();
    }

    pub fn is_ai_playing(&self) -> bool {
        self.ai_playing.load(Ordering::Acquire)
    }

    pub fn is_user_speaking(&self) -> bool {
        self.user_speaking.load(Ordering::Acquire)
    }

    /// Apply the turn policy to the current state.
    ///
    /// Safe to call on every tick: each branch drives toward a fixed point,
    /// so repeated evaluation cannot oscillate.
    pub fn evaluate(&self) {
        let playing = self.ai_playing.load(Ordering::Acquire);
        let speaking = self.user_speaking.load(Ordering::Acquire);
        let recording = self.mic.is_open();

        if playing && recording {
            // The AI holds the floor; echo must not be sent upstream
            debug!("AI playback active, interrupting microphone");
            self.mic.close_mic();
        } else if !playing && !speaking && !recording {
            debug!("Floor is free, resuming microphone");
            self.mic.open_mic();
        }
        // All other combinations: no-op
    }
}

/// Derive the user-speaking flag from the live level stream and keep the
/// coordinator fed. Returns when the level stream closes.
pub async fn watch_user_speech(
    coordinator: Arc<TurnCoordinator>,
    mut levels: broadcast::Receiver<AudioLevel>,
    speaking_threshold: f32,
) {
    loop {
        match levels.recv().await {
            Ok(level) => {
                coordinator.set_user_speaking(level.volume >= speaking_threshold);
            }
            // Only the newest level matters; lag is harmless
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("Level stream closed, speech watcher exiting");
}
