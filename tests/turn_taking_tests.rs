//! Turn-taking policy tests: the microphone and AI playback never hold the
//! floor together

use guidelens_audio::{LevelConfig, LevelMeter};
use guidelens_session::{MicrophoneControl, TurnCoordinator};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct MockMic {
    open: AtomicBool,
}

impl MicrophoneControl for MockMic {
    fn open_mic(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    fn close_mic(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

fn setup(mic_open: bool) -> (Arc<MockMic>, TurnCoordinator) {
    let mic = Arc::new(MockMic::default());
    mic.open.store(mic_open, Ordering::SeqCst);
    let coordinator = TurnCoordinator::new(mic.clone());
    (mic, coordinator)
}

#[test]
fn test_playback_stops_recording_within_one_tick() {
    // Regardless of whether the user is speaking
    for user_speaking in [false, true] {
        let (mic, coordinator) = setup(true);
        coordinator.set_user_speaking(user_speaking);
        mic.open.store(true, Ordering::SeqCst);
        coordinator.set_ai_playing(true);
        assert!(!mic.is_open(), "user_speaking={}", user_speaking);
    }
}

#[test]
fn test_quiet_idle_floor_resumes_recording() {
    let (mic, coordinator) = setup(false);
    coordinator.set_ai_playing(false);
    coordinator.set_user_speaking(false);
    assert!(mic.is_open());
}

#[test]
fn test_remaining_combinations_are_noops() {
    // (playing, speaking, recording) cases not covered by the two rules
    let cases = [
        (false, true, false),  // user about to speak: do not touch the mic
        (false, false, true),  // user already recording: leave as-is
        (false, true, true),   // user speaking and recording: leave as-is
        (true, false, false),  // AI playing, mic already off: leave as-is
        (true, true, false),   // AI playing over user, mic off: leave as-is
    ];
    for (playing, speaking, recording) in cases {
        let (mic, coordinator) = setup(recording);
        coordinator.set_user_speaking(speaking);
        mic.open.store(recording, Ordering::SeqCst);
        coordinator.set_ai_playing(playing);
        assert_eq!(
            mic.is_open(),
            recording,
            "({}, {}, {}) should not change the mic",
            playing,
            speaking,
            recording
        );
    }
}

#[test]
fn test_full_conversation_round_trip() {
    let (mic, coordinator) = setup(false);

    // Idle floor: listening resumes automatically
    coordinator.evaluate();
    assert!(mic.is_open());

    // User speaks; mic stays hot
    coordinator.set_user_speaking(true);
    assert!(mic.is_open());

    // User finishes, AI answers: hard interrupt
    coordinator.set_user_speaking(false);
    coordinator.set_ai_playing(true);
    assert!(!mic.is_open());

    // Playback ends: listening resumes without user action
    coordinator.set_ai_playing(false);
    assert!(mic.is_open());
}

#[test]
fn test_level_meter_drives_speaking_state() {
    let meter = LevelMeter::new(LevelConfig::default());
    let (mic, coordinator) = setup(true);

    // A loud chunk marks the user as speaking
    let loud = vec![(0.3 * i16::MAX as f32) as i16; 1600];
    let level = meter.measure(&loud);
    coordinator.set_user_speaking(meter.is_speaking(level.volume));
    assert!(coordinator.is_user_speaking());

    // Silence releases the flag; with a free floor the mic stays open
    let level = meter.measure(&[0i16; 1600]);
    coordinator.set_user_speaking(meter.is_speaking(level.volume));
    assert!(!coordinator.is_user_speaking());
    assert!(mic.is_open());
}
