//! Behavior-driven tests for circuit breaker protection around provider
//! calls.
//!
//! These tests verify HOW the client guards a failing upstream: when the
//! breaker opens, what the short-circuit costs, and how the half-open probe
//! recovers.

use std::sync::Arc;
use std::time::Duration;

use floradex_core::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, FetchErrorKind, HttpError, ProviderClient,
    ProviderPolicy, RateLimits, RetryConfig, TrefleAdapter,
};
use floradex_tests::{trefle_page, trefle_species, ScriptedHttpClient};

fn tripping_policy(threshold: u32, cooldown: Duration) -> ProviderPolicy {
    ProviderPolicy {
        retry: RetryConfig::no_retry(),
        circuit: CircuitBreakerConfig {
            failure_threshold: threshold,
            cooldown,
        },
        rate_limits: RateLimits {
            per_minute: 10_000,
            per_day: 100_000,
        },
        ..ProviderPolicy::trefle_default()
    }
}

fn client(
    responses: Vec<Result<floradex_core::HttpResponse, HttpError>>,
    policy: &ProviderPolicy,
) -> (ProviderClient, Arc<ScriptedHttpClient>) {
    let http = Arc::new(ScriptedHttpClient::new(responses));
    let adapter = Arc::new(TrefleAdapter::with_token("test-token"));
    (
        ProviderClient::new(adapter, http.clone(), policy),
        http,
    )
}

#[tokio::test]
async fn five_failures_open_the_breaker_and_the_sixth_call_short_circuits() {
    // Given: an upstream that refuses every connection
    let failures = (0..5)
        .map(|_| Err(HttpError::connect("connection refused")))
        .collect();
    let policy = tripping_policy(5, Duration::from_secs(60));
    let (client, http) = client(failures, &policy);

    // When: five consecutive calls fail
    for _ in 0..5 {
        let error = client.fetch_page(1, 20).await.expect_err("upstream is down");
        assert_eq!(error.kind(), FetchErrorKind::Network);
    }

    // Then: the breaker is open and tripped exactly once
    assert_eq!(client.circuit_state(), CircuitState::Open);
    assert_eq!(client.stats().circuit_breaker_trips, 1);

    // And: the sixth call fails fast with zero additional network calls
    let calls_before = http.calls();
    let error = client.fetch_page(1, 20).await.expect_err("short circuit");
    assert_eq!(error.kind(), FetchErrorKind::CircuitOpen);
    assert_eq!(http.calls(), calls_before);
    assert_eq!(client.stats().total_requests, 5);
}

#[tokio::test]
async fn after_cooldown_the_single_probe_closes_the_breaker_on_success() {
    // Given: a breaker opened by failures, with a short cooldown
    let mut responses: Vec<Result<floradex_core::HttpResponse, HttpError>> = (0..2)
        .map(|_| Err(HttpError::connect("connection refused")))
        .collect();
    responses.push(Ok(floradex_core::HttpResponse::ok_json(trefle_page(&[
        trefle_species(1),
    ]))));
    let policy = tripping_policy(2, Duration::from_millis(20));
    let (client, _http) = client(responses, &policy);

    for _ in 0..2 {
        let _ = client.fetch_page(1, 20).await;
    }
    assert_eq!(client.circuit_state(), CircuitState::Open);

    // When: the cooldown elapses and the next call goes through as the probe
    tokio::time::sleep(Duration::from_millis(30)).await;
    let page = client.fetch_page(1, 20).await.expect("probe succeeds");

    // Then: the breaker is closed again with counters reset
    assert_eq!(page.records.len(), 1);
    assert_eq!(client.circuit_state(), CircuitState::Closed);
}

#[tokio::test]
async fn a_failed_probe_reopens_the_breaker_without_double_counting_the_trip() {
    // Given: an opened breaker and an upstream that is still down
    let failures = (0..3)
        .map(|_| Err(HttpError::connect("still down")))
        .collect();
    let policy = tripping_policy(2, Duration::from_millis(20));
    let (client, _http) = client(failures, &policy);

    for _ in 0..2 {
        let _ = client.fetch_page(1, 20).await;
    }
    assert_eq!(client.stats().circuit_breaker_trips, 1);

    // When: the cooldown elapses and the probe fails
    tokio::time::sleep(Duration::from_millis(30)).await;
    let error = client.fetch_page(1, 20).await.expect_err("probe fails");
    assert_eq!(error.kind(), FetchErrorKind::Network);

    // Then: the breaker is open again, but the trip count did not grow
    assert_eq!(client.circuit_state(), CircuitState::Open);
    assert_eq!(client.stats().circuit_breaker_trips, 1);
}

#[test]
fn during_half_open_only_one_probe_is_admitted() {
    // Given: a breaker that has cooled down into half-open
    let breaker = CircuitBreaker::new(CircuitBreakerConfig {
        failure_threshold: 1,
        cooldown: Duration::from_millis(1),
    });
    breaker.record_failure();
    std::thread::sleep(Duration::from_millis(2));

    // When: two callers race for admission
    let first = breaker.try_acquire();
    let second = breaker.try_acquire();

    // Then: exactly one wins; the loser is rejected as if the circuit were open
    assert!(first);
    assert!(!second);
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    // And: once the probe reports success, admission reopens normally
    breaker.record_success();
    assert!(breaker.try_acquire());
    assert_eq!(breaker.state(), CircuitState::Closed);
}
