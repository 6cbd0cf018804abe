use std::time::Duration;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::rate_limit::RateLimits;
use crate::retry::RetryConfig;
use crate::ProviderId;

/// Per-provider resilience and pacing policy.
#[derive(Debug, Clone)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    pub rate_limits: RateLimits,
    pub retry: RetryConfig,
    pub circuit: CircuitBreakerConfig,
    pub request_timeout: Duration,
}

impl ProviderPolicy {
    /// Trefle free tier: 120 requests/minute, 5000/day.
    pub fn trefle_default() -> Self {
        Self {
            provider_id: ProviderId::Trefle,
            rate_limits: RateLimits {
                per_minute: 120,
                per_day: 5_000,
            },
            retry: RetryConfig::default(),
            circuit: CircuitBreakerConfig::default(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Permapeople asks integrations to stay under 30 requests/minute.
    pub fn permapeople_default() -> Self {
        Self {
            provider_id: ProviderId::Permapeople,
            rate_limits: RateLimits {
                per_minute: 30,
                per_day: 1_000,
            },
            retry: RetryConfig::default(),
            circuit: CircuitBreakerConfig::default(),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Self {
        match provider_id {
            ProviderId::Trefle => Self::trefle_default(),
            ProviderId::Permapeople => Self::permapeople_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trefle_policy_matches_free_tier() {
        let policy = ProviderPolicy::trefle_default();

        assert_eq!(policy.provider_id, ProviderId::Trefle);
        assert_eq!(policy.rate_limits.per_minute, 120);
        assert_eq!(policy.rate_limits.per_day, 5_000);
        assert_eq!(policy.circuit.failure_threshold, 5);
    }

    #[test]
    fn permapeople_policy_is_more_conservative() {
        let policy = ProviderPolicy::permapeople_default();

        assert_eq!(policy.provider_id, ProviderId::Permapeople);
        assert!(policy.rate_limits.per_minute < ProviderPolicy::trefle_default().rate_limits.per_minute);
    }
}
