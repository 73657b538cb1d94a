//! Guided-step timer behavior across pause/resume, revisits and resets

use guidelens_session::{StepTimer, TimerRegistry};
use std::time::Duration;

const SEC: Duration = Duration::from_secs(1);

#[test]
fn test_timer_lifecycle() {
    let mut timer = StepTimer::new(Duration::from_secs(3));
    assert!(!timer.is_running());
    assert_eq!(timer.original(), Duration::from_secs(3));

    timer.start();
    assert!(timer.is_running());
    assert!(!timer.tick(SEC));
    assert!(!timer.tick(SEC));
    assert!(timer.tick(SEC));
    assert!(!timer.is_running());
    assert_eq!(timer.remaining(), Duration::ZERO);
}

#[test]
fn test_pause_survives_ticks() {
    let mut timer = StepTimer::new(Duration::from_secs(10));
    timer.start();
    timer.tick(SEC);
    timer.pause();
    for _ in 0..5 {
        assert!(!timer.tick(SEC));
    }
    assert_eq!(timer.remaining(), Duration::from_secs(9));
    timer.resume();
    timer.tick(SEC);
    assert_eq!(timer.remaining(), Duration::from_secs(8));
}

#[test]
fn test_oversized_tick_saturates() {
    let mut timer = StepTimer::new(Duration::from_secs(2));
    timer.start();
    assert!(timer.tick(Duration::from_secs(60)));
    assert_eq!(timer.remaining(), Duration::ZERO);
}

#[test]
fn test_registry_state_survives_step_revisit() {
    let registry = TimerRegistry::new();
    registry.arm("step-2", Duration::from_secs(30));
    registry.tick_all(Duration::from_secs(12));
    registry.pause("step-2");

    // User navigates away and back; re-arming keeps the countdown
    registry.arm("step-5", Duration::from_secs(60));
    registry.arm("step-2", Duration::from_secs(30));

    let timer = registry.get("step-2").unwrap();
    assert_eq!(timer.remaining(), Duration::from_secs(18));
    assert!(timer.is_paused());
}

#[test]
fn test_registry_reset_is_per_step() {
    let registry = TimerRegistry::new();
    registry.arm("a", Duration::from_secs(10));
    registry.arm("b", Duration::from_secs(10));
    registry.tick_all(SEC);
    registry.reset("a");

    assert_eq!(registry.get("a").unwrap().remaining(), Duration::from_secs(10));
    assert_eq!(registry.get("b").unwrap().remaining(), Duration::from_secs(9));
}

#[test]
fn test_registry_clear_on_session_reset() {
    let registry = TimerRegistry::new();
    registry.arm("a", Duration::from_secs(10));
    registry.arm("b", Duration::from_secs(20));
    assert_eq!(registry.len(), 2);
    registry.clear();
    assert!(registry.is_empty());
}

#[test]
fn test_finished_ids_reported_once() {
    let registry = TimerRegistry::new();
    registry.arm("done", Duration::from_secs(1));
    assert_eq!(registry.tick_all(SEC), vec!["done".to_string()]);
    assert!(registry.tick_all(SEC).is_empty());
}
