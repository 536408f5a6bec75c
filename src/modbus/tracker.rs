//! Single-outstanding-request state machine.
//!
//! The client tracks at most one in-flight request. A second send while
//! waiting silently overwrites the tracked state; callers are expected to
//! consult [`RequestTracker::is_waiting`] first.

use std::time::{Duration, Instant};

use log::debug;

/// Default time to wait for a response before giving up.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy)]
pub struct PendingRequest {
    pub unit: u8,
    pub sent_at: Instant,
}

#[derive(Debug)]
pub struct RequestTracker {
    pending: Option<PendingRequest>,
    wait_timeout: Duration,
}

impl RequestTracker {
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            pending: None,
            wait_timeout,
        }
    }

    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    /// Records a transmitted request. Overwrites any tracked state; there is
    /// no queuing and no rejection.
    pub fn mark_sent(&mut self, unit: u8, now: Instant) {
        if let Some(prev) = self.pending {
            debug!(
                "overwriting outstanding request to unit {} with new send to unit {}",
                prev.unit, unit
            );
        }
        self.pending = Some(PendingRequest { unit, sent_at: now });
    }

    /// Clears the outstanding state after a well-formed frame was observed.
    pub fn clear(&mut self) {
        if let Some(prev) = self.pending.take() {
            debug!("response observed, unit {} no longer outstanding", prev.unit);
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    /// Drops the outstanding state once the wait threshold has elapsed.
    /// Evaluated on every tick regardless of whether data arrived.
    /// Returns the abandoned unit address when a timeout fired.
    pub fn check_timeout(&mut self, now: Instant) -> Option<u8> {
        let pending = self.pending?;
        if now.duration_since(pending.sent_at) > self.wait_timeout {
            debug!("stop waiting for response from unit {}", pending.unit);
            self.pending = None;
            Some(pending.unit)
        } else {
            None
        }
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new(DEFAULT_WAIT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_until_send() {
        let mut tracker = RequestTracker::default();
        assert!(!tracker.is_waiting());
        tracker.mark_sent(2, Instant::now());
        assert!(tracker.is_waiting());
        assert_eq!(tracker.pending().unwrap().unit, 2);
    }

    #[test]
    fn test_timeout_clears_after_threshold() {
        let mut tracker = RequestTracker::new(Duration::from_millis(250));
        let t0 = Instant::now();
        tracker.mark_sent(5, t0);

        // Before the threshold: still waiting.
        assert_eq!(tracker.check_timeout(t0 + Duration::from_millis(200)), None);
        assert!(tracker.is_waiting());

        // Past the threshold: dropped.
        assert_eq!(
            tracker.check_timeout(t0 + Duration::from_millis(251)),
            Some(5)
        );
        assert!(!tracker.is_waiting());
    }

    #[test]
    fn test_clear_on_response() {
        let mut tracker = RequestTracker::default();
        tracker.mark_sent(1, Instant::now());
        tracker.clear();
        assert!(!tracker.is_waiting());
        assert_eq!(tracker.check_timeout(Instant::now()), None);
    }

    #[test]
    fn test_second_send_overwrites() {
        let mut tracker = RequestTracker::default();
        let t0 = Instant::now();
        tracker.mark_sent(1, t0);
        tracker.mark_sent(2, t0 + Duration::from_millis(10));

        let pending = tracker.pending().unwrap();
        assert_eq!(pending.unit, 2);
        assert_eq!(pending.sent_at, t0 + Duration::from_millis(10));
    }
}
