//! Health scoring: a pure function of a provider's request counters.

use serde::{Deserialize, Serialize};

use crate::stats::RequestStats;

/// Health classification derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

/// Derived 0-100 reliability score with its contributing issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub score: u8,
    pub status: HealthStatus,
    pub issues: Vec<String>,
}

impl HealthScore {
    pub const fn is_healthy(&self) -> bool {
        matches!(self.status, HealthStatus::Healthy)
    }
}

/// Score a stats snapshot.
///
/// Zero recorded requests is perfect-by-absence: score 100, healthy, with an
/// issue noting there has been no traffic, distinct from perfect health under
/// load.
pub fn score(stats: &RequestStats) -> HealthScore {
    if stats.total_requests == 0 {
        return HealthScore {
            score: 100,
            status: HealthStatus::Healthy,
            issues: vec![String::from("no requests recorded yet")],
        };
    }

    let total = stats.total_requests as f64;
    let success_rate = stats.successful_requests as f64 / total;
    let retry_rate = stats.retried_requests as f64 / total;
    let timeout_rate = stats.timeout_errors as f64 / total;
    let network_rate = stats.network_errors as f64 / total;

    let mut score: i32 = 100;
    let mut issues = Vec::new();

    if success_rate < 0.90 {
        score -= 20;
        issues.push(format!(
            "success rate {:.1}% is below 90%",
            success_rate * 100.0
        ));
    }
    // At or below 70% the second tier applies on top of the first.
    if success_rate <= 0.70 {
        score -= 20;
        issues.push(format!(
            "success rate {:.1}% is at or below 70%",
            success_rate * 100.0
        ));
    }
    if retry_rate > 0.30 {
        score -= 15;
        issues.push(format!("retry rate {:.1}% is above 30%", retry_rate * 100.0));
    }
    if timeout_rate > 0.10 {
        score -= 15;
        issues.push(format!(
            "timeout rate {:.1}% is above 10%",
            timeout_rate * 100.0
        ));
    }
    if network_rate > 0.05 {
        score -= 15;
        issues.push(format!(
            "network error rate {:.1}% is above 5%",
            network_rate * 100.0
        ));
    }
    if stats.rate_limit_errors > 0 {
        score -= 10;
        issues.push(format!(
            "{} rate limit errors recorded",
            stats.rate_limit_errors
        ));
    }
    if stats.circuit_breaker_trips > 0 {
        score -= 20;
        issues.push(format!(
            "circuit breaker tripped {} times",
            stats.circuit_breaker_trips
        ));
    }

    let score = score.max(0) as u8;
    let status = if score >= 80 {
        HealthStatus::Healthy
    } else if score >= 50 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Unhealthy
    };

    HealthScore {
        score,
        status,
        issues,
    }
}
