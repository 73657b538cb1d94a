//! Bounded drop-oldest queue of pending analysis requests
//!
//! Shared between the producer lane (capture triggers, user actions) and
//! the scheduler lane; all synchronization lives inside so callers never
//! take an external lock. Enqueue never blocks: real-time urgency comes
//! from evicting the oldest pending request, not from reordering.

use guidelens_core::AnalysisRequest;
use parking_lot::Mutex;
use std::collections::VecDeque;

pub struct AnalysisQueue {
    inner: Mutex<VecDeque<AnalysisRequest>>,
    bound: usize,
}

impl AnalysisQueue {
    pub fn new(bound: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(bound.min(64))),
            bound: bound.max(1),
        }
    }

    /// Append to the tail. Returns the evicted head when the queue was full.
    pub fn enqueue(&self, request: AnalysisRequest) -> Option<AnalysisRequest> {
        let mut inner = self.inner.lock();
        let evicted = if inner.len() == self.bound {
            inner.pop_front()
        } else {
            None
        };
        inner.push_back(request);
        evicted
    }

    /// Scheduler-only: pop the head, or None when idle
    pub fn pop(&self) -> Option<AnalysisRequest> {
        self.inner.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Drop all pending requests (session stop/restart)
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use guidelens_core::{AgentProfile, SessionMode};

    fn request(tag: &str) -> AnalysisRequest {
        AnalysisRequest::frame(
            tag.to_string(),
            AgentProfile::new("chef", "Chef", "persona"),
            SessionMode::RealTime,
            Bytes::from_static(&[0u8; 4]),
            2,
            2,
        )
    }

    #[test]
    fn test_fifo_order() {
        let queue = AnalysisQueue::new(10);
        queue.enqueue(request("a"));
        queue.enqueue(request("b"));
        assert_eq!(queue.pop().unwrap().prompt, "a");
        assert_eq!(queue.pop().unwrap().prompt, "b");
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_never_exceeds_bound() {
        let queue = AnalysisQueue::new(10);
        for i in 0..15 {
            queue.enqueue(request(&format!("r{}", i)));
            assert!(queue.len() <= 10);
        }
        assert_eq!(queue.len(), 10);
    }

    #[test]
    fn test_evicts_oldest_keeps_newest() {
        let queue = AnalysisQueue::new(10);
        for i in 0..15 {
            let evicted = queue.enqueue(request(&format!("r{}", i)));
            if i < 10 {
                assert!(evicted.is_none());
            } else {
                // r0..r4 go out as r10..r14 come in
                assert_eq!(evicted.unwrap().prompt, format!("r{}", i - 10));
            }
        }
        let remaining: Vec<String> = std::iter::from_fn(|| queue.pop())
            .map(|r| r.prompt)
            .collect();
        let expected: Vec<String> = (5..15).map(|i| format!("r{}", i)).collect();
        assert_eq!(remaining, expected);
    }

    #[test]
    fn test_clear() {
        let queue = AnalysisQueue::new(4);
        queue.enqueue(request("a"));
        queue.enqueue(request("b"));
        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_zero_bound_clamped_to_one() {
        let queue = AnalysisQueue::new(0);
        queue.enqueue(request("a"));
        let evicted = queue.enqueue(request("b"));
        assert_eq!(evicted.unwrap().prompt, "a");
        assert_eq!(queue.len(), 1);
    }
}
