//! Guided-step timers
//!
//! Each step of a guided session may arm one timer. Timer state survives
//! the step being revisited and app backgrounding; it is destroyed only
//! when the guided session resets.

use dashmap::DashMap;
use std::time::Duration;

/// Countdown state for one guided step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTimer {
    original: Duration,
    remaining: Duration,
    running: bool,
    paused: bool,
}

impl StepTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            original: duration,
            remaining: duration,
            running: false,
            paused: false,
        }
    }

    pub fn start(&mut self) {
        if !self.remaining.is_zero() {
            self.running = true;
            self.paused = false;
        }
    }

    pub fn pause(&mut self) {
        if self.running {
            self.paused = true;
        }
    }

    /// No-op without a prior pause
    pub fn resume(&mut self) {
        if self.running && self.paused {
            self.paused = false;
        }
    }

    pub fn reset(&mut self) {
        self.remaining = self.original;
        self.running = false;
        self.paused = false;
    }

    /// Advance the clock. Returns true when this tick finished the timer.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        if !self.running || self.paused {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(elapsed);
        if self.remaining.is_zero() {
            self.running = false;
            return true;
        }
        false
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn original(&self) -> Duration {
        self.original
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

/// All step timers of the current guided session, keyed by step id
pub struct TimerRegistry {
    timers: DashMap<String, StepTimer>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self {
            timers: DashMap::new(),
        }
    }

    /// Arm the step's timer, starting it on first arm. Revisiting an armed
    /// step keeps its existing state, including a pause, instead of
    /// rewinding or restarting it.
    pub fn arm(&self, step_id: &str, duration: Duration) {
        match self.timers.entry(step_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {}
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let mut timer = StepTimer::new(duration);
                timer.start();
                vacant.insert(timer);
            }
        }
    }

    pub fn pause(&self, step_id: &str) {
        if let Some(mut timer) = self.timers.get_mut(step_id) {
            timer.pause();
        }
    }

    pub fn resume(&self, step_id: &str) {
        if let Some(mut timer) = self.timers.get_mut(step_id) {
            timer.resume();
        }
    }

    pub fn reset(&self, step_id: &str) {
        if let Some(mut timer) = self.timers.get_mut(step_id) {
            timer.reset();
        }
    }

    /// Advance every timer; returns the ids that finished on this tick
    pub fn tick_all(&self, elapsed: Duration) -> Vec<String> {
        let mut finished = Vec::new();
        for mut entry in self.timers.iter_mut() {
            if entry.value_mut().tick(elapsed) {
                finished.push(entry.key().clone());
            }
        }
        finished
    }

    /// Snapshot of one step's timer, if armed
    pub fn get(&self, step_id: &str) -> Option<StepTimer> {
        self.timers.get(step_id).map(|t| t.clone())
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Guided session reset: destroy all timer state
    pub fn clear(&self) {
        self.timers.clear();
    }
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
