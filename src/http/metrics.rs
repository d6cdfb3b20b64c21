//! Request counters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Request metrics for monitoring.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    /// Total requests received.
    pub requests_total: AtomicU64,
    /// Requests refused with 403.
    pub requests_rejected: AtomicU64,
    /// Requests that hit a backend failure.
    pub requests_failed: AtomicU64,
    /// Requests currently being handled.
    pub in_flight: AtomicUsize,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a new request and track it as in flight until the guard drops.
    pub fn begin(self: &Arc<Self>) -> InFlightGuard {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            metrics: Arc::clone(self),
        }
    }

    pub fn record_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.requests_rejected.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    pub fn active(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }
}

/// Decrements the in-flight count when dropped.
pub struct InFlightGuard {
    metrics: Arc<RequestMetrics>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.metrics.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
