//! Local request-rate gate: per-provider minute and day quotas.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Quota configuration for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub per_minute: u32,
    pub per_day: u32,
}

/// In-memory rate gate enforcing both quotas atomically under concurrent
/// callers. Denial has no side effects beyond the limiter state; the caller
/// treats it as a `RateLimited` condition.
#[derive(Clone)]
pub struct RateGate {
    minute: Arc<DirectRateLimiter>,
    day: Arc<DirectRateLimiter>,
    clock: DefaultClock,
}

impl RateGate {
    pub fn new(limits: RateLimits) -> Self {
        let clock = DefaultClock::default();
        Self {
            minute: Arc::new(RateLimiter::direct_with_clock(
                quota_from_window(Duration::from_secs(60), limits.per_minute),
                &clock,
            )),
            day: Arc::new(RateLimiter::direct_with_clock(
                quota_from_window(Duration::from_secs(86_400), limits.per_day),
                &clock,
            )),
            clock,
        }
    }

    /// True when the request may be sent now. Consumes one cell from each
    /// quota on success.
    pub fn allow(&self) -> bool {
        self.acquire().is_ok()
    }

    /// Tries to acquire rate budget; on denial returns the earliest delay
    /// after which a retry could succeed.
    ///
    /// The minute limiter is consulted first. A minute-grant that the day
    /// limiter then denies costs one minute cell, which self-corrects within
    /// the window.
    pub fn acquire(&self) -> Result<(), Duration> {
        let now = self.clock.now();

        self.minute
            .check()
            .map_err(|not_until| not_until.wait_time_from(now))?;
        self.day
            .check()
            .map_err(|not_until| not_until.wait_time_from(now))?;

        Ok(())
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let safe_limit = quota_limit.max(1);
    let burst = NonZeroU32::new(safe_limit).expect("safe limit must be non-zero");

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(safe_limit)).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .expect("period is always greater than zero")
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denies_once_minute_quota_is_exhausted() {
        let gate = RateGate::new(RateLimits {
            per_minute: 2,
            per_day: 100,
        });

        assert!(gate.allow());
        assert!(gate.allow());
        assert!(!gate.allow(), "third request in the window must be denied");
    }

    #[test]
    fn denial_reports_a_positive_retry_delay() {
        let gate = RateGate::new(RateLimits {
            per_minute: 1,
            per_day: 100,
        });

        assert!(gate.acquire().is_ok());
        let delay = gate.acquire().expect_err("second request should be denied");
        assert!(delay > Duration::ZERO);
    }

    #[test]
    fn window_rollover_replenishes_budget() {
        // Exercises the same quota construction as the minute/day gates,
        // scaled down so the window rolls over within the test.
        let limiter = RateLimiter::direct(quota_from_window(Duration::from_millis(100), 2));

        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err(), "budget exhausted for this window");

        std::thread::sleep(Duration::from_millis(60));
        assert!(
            limiter.check().is_ok(),
            "one cell replenishes after the per-cell period"
        );
    }

    #[test]
    fn day_quota_caps_a_generous_minute_quota() {
        let gate = RateGate::new(RateLimits {
            per_minute: 100,
            per_day: 3,
        });

        for _ in 0..3 {
            assert!(gate.allow());
        }
        assert!(!gate.allow(), "daily quota must deny the fourth request");
    }
}
