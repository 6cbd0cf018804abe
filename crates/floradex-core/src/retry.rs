//! Retry policy: failure classification and backoff with jitter.

use std::time::Duration;

use crate::adapter::{FetchError, FetchErrorKind};

/// Backoff strategy for retrying failed requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed {
        /// Delay between retries.
        delay: Duration,
    },
    /// Uses an exponential delay between retries.
    ///
    /// The delay is calculated as `base * (factor ^ attempt)`.
    Exponential {
        /// The initial backoff duration.
        base: Duration,
        /// The multiplicative factor for each subsequent retry.
        factor: f64,
        /// The maximum duration to wait between retries.
        max: Duration,
        /// Whether to apply random jitter (+/- 50%) to the delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(500),
            factor: 2.0,
            max: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Calculate the delay for a given retry attempt (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt as i32);
                let seconds = base.as_secs_f64() * scale;
                let capped_seconds = seconds.min(max.as_secs_f64());

                let mut delay = Duration::from_secs_f64(capped_seconds);

                // Jitter spreads concurrent page retries so they do not
                // hammer a recovering upstream in lockstep.
                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
                    let random_offset = fastrand::u64(0..=(jitter_ms * 2));
                    let total_ms =
                        delay.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
                    delay = Duration::from_millis(total_ms.max(0) as u64);
                }

                delay
            }
        }
    }
}

/// Classification of a fetch failure from the retry policy's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Retryable,
    NonRetryable,
}

/// Configuration for the automatic retry mechanism.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// The maximum number of retries to attempt.
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// The backoff strategy to use between retries.
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with exponential backoff.
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Create a new retry configuration with fixed backoff.
    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
        }
    }

    /// Disable retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Classify a fetch failure. Timeouts, connection failures, HTTP 429 and
    /// 5xx are retryable; everything else fails immediately.
    pub fn classify(&self, error: &FetchError) -> RetryClass {
        match error.kind() {
            FetchErrorKind::Timeout
            | FetchErrorKind::Network
            | FetchErrorKind::UpstreamRateLimited
            | FetchErrorKind::UpstreamServer => RetryClass::Retryable,
            FetchErrorKind::NotConfigured
            | FetchErrorKind::RateLimited
            | FetchErrorKind::CircuitOpen
            | FetchErrorKind::UpstreamClient
            | FetchErrorKind::InvalidResponse => RetryClass::NonRetryable,
        }
    }

    /// Delay before the next attempt. An upstream `Retry-After` hint takes
    /// precedence over the computed backoff.
    pub fn delay_for(&self, attempt: u32, error: &FetchError) -> Duration {
        if error.kind() == FetchErrorKind::UpstreamRateLimited {
            if let Some(hint) = error.retry_after() {
                return hint;
            }
        }
        self.backoff.delay(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderId;

    #[test]
    fn test_fixed_backoff() {
        let backoff = Backoff::Fixed {
            delay: Duration::from_millis(100),
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(10), Duration::from_millis(100));
    }

    #[test]
    fn test_exponential_backoff() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: false,
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(3), Duration::from_millis(800));
        assert_eq!(backoff.delay(4), Duration::from_secs(1)); // capped
    }

    #[test]
    fn test_exponential_backoff_with_jitter() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: true,
        };

        // With jitter, delay should be within +/- 50%.
        // Run multiple times to account for randomness.
        for _ in 0..10 {
            for attempt in 0..5 {
                let delay = backoff.delay(attempt);
                let expected_base = 100.0 * 2_f64.powi(attempt as i32);
                let expected_capped = expected_base.min(1000.0);
                let delay_ms = delay.as_millis() as f64;

                // Use 0.49 and 1.51 to account for integer rounding errors
                assert!(
                    delay_ms >= expected_capped * 0.49,
                    "attempt={attempt}, delay_ms={delay_ms}, expected_capped={expected_capped}"
                );
                assert!(
                    delay_ms <= expected_capped * 1.51,
                    "attempt={attempt}, delay_ms={delay_ms}, expected_capped={expected_capped}"
                );
            }
        }
    }

    #[test]
    fn classifies_transient_failures_as_retryable() {
        let config = RetryConfig::default();

        for error in [
            FetchError::timeout("request timeout"),
            FetchError::network("connection refused"),
            FetchError::upstream_rate_limited(ProviderId::Trefle, None),
            FetchError::upstream_server(ProviderId::Trefle, 503),
        ] {
            assert_eq!(config.classify(&error), RetryClass::Retryable, "{error}");
        }
    }

    #[test]
    fn classifies_client_errors_as_non_retryable() {
        let config = RetryConfig::default();

        for error in [
            FetchError::upstream_client(ProviderId::Permapeople, 404),
            FetchError::invalid_response("missing data array"),
            FetchError::circuit_open(ProviderId::Permapeople),
            FetchError::rate_limited(ProviderId::Permapeople, Duration::from_secs(3)),
            FetchError::not_configured(ProviderId::Permapeople),
        ] {
            assert_eq!(config.classify(&error), RetryClass::NonRetryable, "{error}");
        }
    }

    #[test]
    fn retry_after_hint_overrides_backoff() {
        let config = RetryConfig {
            backoff: Backoff::Fixed {
                delay: Duration::from_millis(100),
            },
            max_retries: 3,
        };

        let hinted =
            FetchError::upstream_rate_limited(ProviderId::Trefle, Some(Duration::from_secs(20)));
        assert_eq!(config.delay_for(0, &hinted), Duration::from_secs(20));

        let unhinted = FetchError::upstream_rate_limited(ProviderId::Trefle, None);
        assert_eq!(config.delay_for(0, &unhinted), Duration::from_millis(100));

        let server = FetchError::upstream_server(ProviderId::Trefle, 500);
        assert_eq!(config.delay_for(0, &server), Duration::from_millis(100));
    }
}
