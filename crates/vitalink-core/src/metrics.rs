//! Session counters.
//!
//! [`SessionMetrics`] is shared through an `Arc` and updated with relaxed
//! atomics from every session that was given it. It is the counter hook for
//! dropped records: a malformed notification never fails a session, but it
//! always shows up in `records_dropped`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time copy of [`SessionMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub sessions_started: u64,
    pub sessions_completed: u64,
    pub sessions_failed: u64,
    pub sessions_timed_out: u64,
    pub sessions_cancelled: u64,
    pub notifications_received: u64,
    pub samples_parsed: u64,
    pub records_dropped: u64,
}

impl MetricsSnapshot {
    /// Fraction of notifications that parsed into samples.
    pub fn parse_rate(&self) -> Option<f64> {
        if self.notifications_received == 0 {
            None
        } else {
            Some(self.samples_parsed as f64 / self.notifications_received as f64)
        }
    }
}

/// Thread-safe session counters.
#[derive(Debug, Default)]
pub struct SessionMetrics {
    sessions_started: AtomicU64,
    sessions_completed: AtomicU64,
    sessions_failed: AtomicU64,
    sessions_timed_out: AtomicU64,
    sessions_cancelled: AtomicU64,
    notifications_received: AtomicU64,
    samples_parsed: AtomicU64,
    records_dropped: AtomicU64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create shared metrics.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub(crate) fn record_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed session; timeouts and cancellations are also counted
    /// in their own buckets.
    pub(crate) fn record_failed(&self, error: &crate::Error) {
        match error {
            crate::Error::Cancelled => {
                self.sessions_cancelled.fetch_add(1, Ordering::Relaxed);
            }
            crate::Error::Timeout { .. } => {
                self.sessions_timed_out.fetch_add(1, Ordering::Relaxed);
                self.sessions_failed.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.sessions_failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub(crate) fn record_notification(&self) {
        self.notifications_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sample(&self) {
        self.samples_parsed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            sessions_failed: self.sessions_failed.load(Ordering::Relaxed),
            sessions_timed_out: self.sessions_timed_out.load(Ordering::Relaxed),
            sessions_cancelled: self.sessions_cancelled.load(Ordering::Relaxed),
            notifications_received: self.notifications_received.load(Ordering::Relaxed),
            samples_parsed: self.samples_parsed.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.sessions_started,
            &self.sessions_completed,
            &self.sessions_failed,
            &self.sessions_timed_out,
            &self.sessions_cancelled,
            &self.notifications_received,
            &self.samples_parsed,
            &self.records_dropped,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_counters() {
        let metrics = SessionMetrics::new();
        metrics.record_started();
        metrics.record_notification();
        metrics.record_notification();
        metrics.record_sample();
        metrics.record_dropped();
        metrics.record_completed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.sessions_started, 1);
        assert_eq!(snapshot.notifications_received, 2);
        assert_eq!(snapshot.samples_parsed, 1);
        assert_eq!(snapshot.records_dropped, 1);
        assert_eq!(snapshot.sessions_completed, 1);
        assert_eq!(snapshot.parse_rate(), Some(0.5));
    }

    #[test]
    fn test_failure_buckets() {
        let metrics = SessionMetrics::new();
        metrics.record_failed(&crate::Error::Cancelled);
        metrics.record_failed(&crate::Error::timeout("read", Duration::from_secs(30)));
        metrics.record_failed(&crate::Error::ConnectionLost);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.sessions_cancelled, 1);
        assert_eq!(snapshot.sessions_timed_out, 1);
        assert_eq!(snapshot.sessions_failed, 2);
    }

    #[test]
    fn test_reset() {
        let metrics = SessionMetrics::new();
        metrics.record_started();
        metrics.record_dropped();
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
        assert_eq!(metrics.snapshot().parse_rate(), None);
    }
}
