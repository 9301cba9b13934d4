//! Per-provider health tracking
//!
//! Health counters are instance fields owned by the provider object, never
//! process-wide state. Anything that needs a health decision reads a
//! [`ProviderHealthStatus`] snapshot.

use std::time::Instant;

use parking_lot::RwLock;

use speech_bridge_core::ProviderHealthStatus;

/// Consecutive failures before a provider is considered unhealthy.
const UNHEALTHY_THRESHOLD: u32 = 3;

/// Mutable success/failure counters for one provider.
pub struct ProviderHealthTracker {
    status: RwLock<ProviderHealthStatus>,
}

impl ProviderHealthTracker {
    pub fn new() -> Self {
        Self {
            status: RwLock::new(ProviderHealthStatus::default()),
        }
    }

    /// Any success resets the failure count and restores health.
    pub fn record_success(&self) {
        let mut status = self.status.write();
        status.failures = 0;
        status.is_healthy = true;
        status.reason = None;
    }

    /// Record a failure; the provider flips unhealthy at the third
    /// consecutive one.
    pub fn record_failure(&self, reason: &str) {
        let mut status = self.status.write();
        status.failures += 1;
        status.last_failure = Some(Instant::now());
        status.reason = Some(reason.to_string());
        if status.failures >= UNHEALTHY_THRESHOLD {
            status.is_healthy = false;
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status.read().is_healthy
    }

    pub fn status(&self) -> ProviderHealthStatus {
        self.status.read().clone()
    }
}

impl Default for ProviderHealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unhealthy_after_three_failures() {
        let tracker = ProviderHealthTracker::new();
        assert!(tracker.is_healthy());

        tracker.record_failure("timeout");
        tracker.record_failure("timeout");
        assert!(tracker.is_healthy());

        tracker.record_failure("timeout");
        assert!(!tracker.is_healthy());
        assert_eq!(tracker.status().failures, 3);
    }

    #[test]
    fn test_success_resets() {
        let tracker = ProviderHealthTracker::new();
        for _ in 0..5 {
            tracker.record_failure("refused");
        }
        assert!(!tracker.is_healthy());

        tracker.record_success();
        let status = tracker.status();
        assert!(status.is_healthy);
        assert_eq!(status.failures, 0);
        assert!(status.reason.is_none());
        // Last failure timestamp is informational and survives the reset
        assert!(status.last_failure.is_some());
    }
}
