//! Per-provider request counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::adapter::{FetchError, FetchErrorKind};

/// Serializable snapshot of a provider's request counters.
///
/// Counters increase monotonically until an explicit admin reset. `total`,
/// `successful` and `failed` count logical calls that reached the network
/// stage; `total_retries` counts extra attempts within those calls; the
/// per-kind error counters count individual attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub retried_requests: u64,
    pub total_retries: u64,
    pub timeout_errors: u64,
    pub network_errors: u64,
    pub rate_limit_errors: u64,
    pub circuit_breaker_trips: u64,
}

/// Lock-free counter set owned by one provider client.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    retried_requests: AtomicU64,
    total_retries: AtomicU64,
    timeout_errors: AtomicU64,
    network_errors: AtomicU64,
    rate_limit_errors: AtomicU64,
    circuit_breaker_trips: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Marks a logical call as having needed at least one retry.
    pub fn record_retried_request(&self) {
        self.retried_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.total_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.rate_limit_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trip(&self) {
        self.circuit_breaker_trips.fetch_add(1, Ordering::Relaxed);
    }

    /// Bucket an attempt failure into its per-kind counter.
    pub fn record_attempt_error(&self, error: &FetchError) {
        match error.kind() {
            FetchErrorKind::Timeout => {
                self.timeout_errors.fetch_add(1, Ordering::Relaxed);
            }
            FetchErrorKind::Network => {
                self.network_errors.fetch_add(1, Ordering::Relaxed);
            }
            FetchErrorKind::UpstreamRateLimited => {
                self.rate_limit_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn snapshot(&self) -> RequestStats {
        RequestStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            retried_requests: self.retried_requests.load(Ordering::Relaxed),
            total_retries: self.total_retries.load(Ordering::Relaxed),
            timeout_errors: self.timeout_errors.load(Ordering::Relaxed),
            network_errors: self.network_errors.load(Ordering::Relaxed),
            rate_limit_errors: self.rate_limit_errors.load(Ordering::Relaxed),
            circuit_breaker_trips: self.circuit_breaker_trips.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.successful_requests.store(0, Ordering::Relaxed);
        self.failed_requests.store(0, Ordering::Relaxed);
        self.retried_requests.store(0, Ordering::Relaxed);
        self.total_retries.store(0, Ordering::Relaxed);
        self.timeout_errors.store(0, Ordering::Relaxed);
        self.network_errors.store(0, Ordering::Relaxed);
        self.rate_limit_errors.store(0, Ordering::Relaxed);
        self.circuit_breaker_trips.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderId;

    #[test]
    fn snapshot_reflects_recorded_counters() {
        let recorder = StatsRecorder::new();

        recorder.record_request();
        recorder.record_request();
        recorder.record_success();
        recorder.record_failure();
        recorder.record_retried_request();
        recorder.record_retry();
        recorder.record_retry();
        recorder.record_trip();

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.successful_requests, 1);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.retried_requests, 1);
        assert_eq!(snapshot.total_retries, 2);
        assert_eq!(snapshot.circuit_breaker_trips, 1);
    }

    #[test]
    fn attempt_errors_land_in_their_kind_buckets() {
        let recorder = StatsRecorder::new();

        recorder.record_attempt_error(&FetchError::timeout("request timeout"));
        recorder.record_attempt_error(&FetchError::network("connection refused"));
        recorder.record_attempt_error(&FetchError::upstream_rate_limited(ProviderId::Trefle, None));
        recorder.record_attempt_error(&FetchError::upstream_server(ProviderId::Trefle, 500));

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.timeout_errors, 1);
        assert_eq!(snapshot.network_errors, 1);
        assert_eq!(snapshot.rate_limit_errors, 1);
    }

    #[test]
    fn reset_zeroes_everything() {
        let recorder = StatsRecorder::new();
        recorder.record_request();
        recorder.record_success();

        recorder.reset();
        assert_eq!(recorder.snapshot(), RequestStats::default());
    }
}
