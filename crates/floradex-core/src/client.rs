//! Resilient provider client: rate gate, circuit breaker, and bounded
//! retries around one provider's HTTP surface.
//!
//! This is the only component that mutates [`RequestStats`] and the only one
//! that reports request outcomes to the circuit breaker.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::adapter::{FetchError, Page, ProviderAdapter};
use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::domain::PlantPatch;
use crate::http_client::{HttpClient, HttpErrorKind, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::rate_limit::RateGate;
use crate::retry::{RetryClass, RetryConfig};
use crate::stats::{RequestStats, StatsRecorder};
use crate::ProviderId;

/// Per-provider client handle. Construct one per provider at startup and
/// share it; all state (stats, breaker, rate gate) lives inside.
pub struct ProviderClient {
    adapter: Arc<dyn ProviderAdapter>,
    http: Arc<dyn HttpClient>,
    breaker: CircuitBreaker,
    gate: RateGate,
    retry: RetryConfig,
    stats: StatsRecorder,
    request_timeout_ms: u64,
}

impl ProviderClient {
    pub fn new(
        adapter: Arc<dyn ProviderAdapter>,
        http: Arc<dyn HttpClient>,
        policy: &ProviderPolicy,
    ) -> Self {
        Self {
            adapter,
            http,
            breaker: CircuitBreaker::new(policy.circuit),
            gate: RateGate::new(policy.rate_limits),
            retry: policy.retry.clone(),
            stats: StatsRecorder::new(),
            request_timeout_ms: policy.request_timeout.as_millis() as u64,
        }
    }

    pub fn provider(&self) -> ProviderId {
        self.adapter.provider()
    }

    pub fn is_configured(&self) -> bool {
        self.adapter.is_configured()
    }

    pub fn stats(&self) -> RequestStats {
        self.stats.snapshot()
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Admin reset: zeroes the counters and closes the breaker.
    pub fn reset(&self) {
        self.stats.reset();
        self.breaker.reset();
    }

    /// Fetch one listing page. An empty page means the provider has no
    /// further data.
    pub async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Page, FetchError> {
        let request = self.adapter.page_request(page, page_size);
        let records = self
            .execute(request, |body| self.adapter.parse_page(body))
            .await?;

        Ok(Page {
            page_number: page,
            records,
        })
    }

    /// Look up enrichment data for a single record; `None` means no match.
    pub async fn enrich(&self, query: &str) -> Result<Option<PlantPatch>, FetchError> {
        let request = self.adapter.enrich_request(query);
        self.execute(request, |body| self.adapter.parse_enrich(body))
            .await
    }

    /// Guarded, retried execution of one logical call.
    async fn execute<T>(
        &self,
        request: HttpRequest,
        parse: impl Fn(&str) -> Result<T, FetchError>,
    ) -> Result<T, FetchError> {
        let provider = self.provider();

        if !self.adapter.is_configured() {
            return Err(FetchError::not_configured(provider));
        }

        if let Err(retry_in) = self.gate.acquire() {
            self.stats.record_rate_limited();
            return Err(FetchError::rate_limited(provider, retry_in));
        }

        if !self.breaker.try_acquire() {
            return Err(FetchError::circuit_open(provider));
        }

        let request = request.with_timeout_ms(self.request_timeout_ms);
        self.stats.record_request();

        let mut attempt: u32 = 0;
        let mut retried = false;

        loop {
            match self.attempt(&request, &parse).await {
                Ok(value) => {
                    self.breaker.record_success();
                    self.stats.record_success();
                    return Ok(value);
                }
                Err(error) => {
                    self.stats.record_attempt_error(&error);
                    if self.breaker.record_failure() {
                        self.stats.record_trip();
                        warn!(
                            provider = %provider,
                            failures = self.breaker.consecutive_failures(),
                            "circuit breaker opened"
                        );
                    }

                    let retryable = self.retry.classify(&error) == RetryClass::Retryable;
                    if !retryable || attempt >= self.retry.max_retries {
                        self.stats.record_failure();
                        return Err(error);
                    }

                    let delay = self.retry.delay_for(attempt, &error);
                    debug!(
                        provider = %provider,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying failed request"
                    );

                    if !retried {
                        retried = true;
                        self.stats.record_retried_request();
                    }
                    self.stats.record_retry();
                    attempt += 1;

                    tokio::time::sleep(delay).await;

                    // Every retry attempt must clear the gate and breaker
                    // again; a denial ends the logical call.
                    if let Err(retry_in) = self.gate.acquire() {
                        self.stats.record_rate_limited();
                        self.stats.record_failure();
                        return Err(FetchError::rate_limited(provider, retry_in));
                    }
                    if !self.breaker.try_acquire() {
                        self.stats.record_failure();
                        return Err(FetchError::circuit_open(provider));
                    }
                }
            }
        }
    }

    /// One network attempt: transport call plus status classification plus
    /// boundary parsing.
    async fn attempt<T>(
        &self,
        request: &HttpRequest,
        parse: impl Fn(&str) -> Result<T, FetchError>,
    ) -> Result<T, FetchError> {
        let provider = self.provider();

        let response = match self.http.execute(request.clone()).await {
            Ok(response) => response,
            Err(error) => {
                return Err(match error.kind() {
                    HttpErrorKind::Timeout => FetchError::timeout(format!(
                        "{provider} transport error: {}",
                        error.message()
                    )),
                    HttpErrorKind::Connect | HttpErrorKind::Other => FetchError::network(
                        format!("{provider} transport error: {}", error.message()),
                    ),
                });
            }
        };

        match response.status {
            status if (200..300).contains(&status) => parse(&response.body),
            429 => Err(FetchError::upstream_rate_limited(
                provider,
                response
                    .retry_after_secs()
                    .map(std::time::Duration::from_secs),
            )),
            status if (500..600).contains(&status) => {
                Err(FetchError::upstream_server(provider, status))
            }
            status => Err(FetchError::upstream_client(provider, status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::FetchErrorKind;
    use crate::circuit_breaker::CircuitBreakerConfig;
    use crate::domain::PlantRecord;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::rate_limit::RateLimits;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeAdapter {
        configured: bool,
    }

    impl ProviderAdapter for FakeAdapter {
        fn provider(&self) -> ProviderId {
            ProviderId::Trefle
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        fn page_request(&self, page: u32, page_size: u32) -> HttpRequest {
            HttpRequest::get(format!(
                "https://example.test/plants?page={page}&size={page_size}"
            ))
        }

        fn parse_page(&self, body: &str) -> Result<Vec<PlantRecord>, FetchError> {
            let ids: Vec<u64> = serde_json::from_str(body)
                .map_err(|e| FetchError::invalid_response(e.to_string()))?;
            Ok(ids
                .into_iter()
                .map(|id| {
                    PlantRecord::new(id.to_string(), format!("Species {id}"))
                        .expect("test record is valid")
                })
                .collect())
        }

        fn enrich_request(&self, query: &str) -> HttpRequest {
            HttpRequest::get(format!("https://example.test/search?q={query}"))
        }

        fn parse_enrich(&self, _body: &str) -> Result<Option<PlantPatch>, FetchError> {
            Ok(None)
        }
    }

    struct ScriptedHttpClient {
        responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
        calls: Mutex<u64>,
    }

    impl ScriptedHttpClient {
        fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u64 {
            *self.calls.lock().expect("calls lock")
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            *self.calls.lock().expect("calls lock") += 1;
            let next = self
                .responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .unwrap_or_else(|| Err(HttpError::connect("script exhausted")));
            Box::pin(async move { next })
        }

        fn is_mock(&self) -> bool {
            true
        }
    }

    fn client_with(
        responses: Vec<Result<HttpResponse, HttpError>>,
        retry: RetryConfig,
        circuit: CircuitBreakerConfig,
    ) -> (ProviderClient, Arc<ScriptedHttpClient>) {
        let http = Arc::new(ScriptedHttpClient::new(responses));
        let policy = ProviderPolicy {
            retry,
            circuit,
            rate_limits: RateLimits {
                per_minute: 1_000,
                per_day: 10_000,
            },
            ..ProviderPolicy::trefle_default()
        };
        let client = ProviderClient::new(
            Arc::new(FakeAdapter { configured: true }),
            http.clone(),
            &policy,
        );
        (client, http)
    }

    #[tokio::test]
    async fn successful_page_fetch_updates_stats() {
        let (client, _http) = client_with(
            vec![Ok(HttpResponse::ok_json("[1, 2, 3]"))],
            RetryConfig::no_retry(),
            CircuitBreakerConfig::default(),
        );

        let page = client.fetch_page(1, 20).await.expect("page fetch");
        assert_eq!(page.records.len(), 3);

        let stats = client.stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.successful_requests, 1);
        assert_eq!(stats.failed_requests, 0);
    }

    #[tokio::test]
    async fn unconfigured_client_refuses_without_io() {
        let http = Arc::new(ScriptedHttpClient::new(vec![]));
        let client = ProviderClient::new(
            Arc::new(FakeAdapter { configured: false }),
            http.clone(),
            &ProviderPolicy::trefle_default(),
        );

        let error = client.fetch_page(1, 20).await.expect_err("must refuse");
        assert_eq!(error.kind(), FetchErrorKind::NotConfigured);
        assert_eq!(http.calls(), 0);
        assert_eq!(client.stats(), RequestStats::default());
    }

    #[tokio::test]
    async fn server_errors_are_retried_up_to_the_bound() {
        let (client, http) = client_with(
            vec![
                Ok(HttpResponse::with_status(503, "{}")),
                Ok(HttpResponse::with_status(503, "{}")),
                Ok(HttpResponse::ok_json("[7]")),
            ],
            RetryConfig::fixed(Duration::from_millis(1), 3),
            CircuitBreakerConfig::default(),
        );

        let page = client.fetch_page(1, 20).await.expect("retried fetch");
        assert_eq!(page.records.len(), 1);
        assert_eq!(http.calls(), 3);

        let stats = client.stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.successful_requests, 1);
        assert_eq!(stats.retried_requests, 1);
        assert_eq!(stats.total_retries, 2);
    }

    #[tokio::test]
    async fn client_errors_fail_immediately() {
        let (client, http) = client_with(
            vec![Ok(HttpResponse::with_status(404, "{}"))],
            RetryConfig::fixed(Duration::from_millis(1), 3),
            CircuitBreakerConfig::default(),
        );

        let error = client.fetch_page(1, 20).await.expect_err("must fail");
        assert_eq!(error.kind(), FetchErrorKind::UpstreamClient);
        assert_eq!(http.calls(), 1, "4xx must not be retried");
        assert_eq!(client.stats().failed_requests, 1);
    }

    #[tokio::test]
    async fn open_circuit_short_circuits_without_network_calls() {
        let failures: Vec<Result<HttpResponse, HttpError>> = (0..5)
            .map(|_| Err(HttpError::connect("connection refused")))
            .collect();
        let (client, http) = client_with(
            failures,
            RetryConfig::no_retry(),
            CircuitBreakerConfig {
                failure_threshold: 5,
                cooldown: Duration::from_secs(60),
            },
        );

        for _ in 0..5 {
            let _ = client.fetch_page(1, 20).await;
        }
        assert_eq!(client.circuit_state(), CircuitState::Open);
        assert_eq!(client.stats().circuit_breaker_trips, 1);

        let calls_before = http.calls();
        let error = client.fetch_page(1, 20).await.expect_err("must short-circuit");
        assert_eq!(error.kind(), FetchErrorKind::CircuitOpen);
        assert_eq!(http.calls(), calls_before, "no network attempt while open");
        assert_eq!(
            client.stats().total_requests,
            5,
            "short-circuited call is not a request"
        );
    }

    #[tokio::test]
    async fn local_rate_gate_denial_is_counted_but_not_sent() {
        let http = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(
            "[1]",
        ))]));
        let policy = ProviderPolicy {
            rate_limits: RateLimits {
                per_minute: 1,
                per_day: 100,
            },
            retry: RetryConfig::no_retry(),
            ..ProviderPolicy::trefle_default()
        };
        let client = ProviderClient::new(
            Arc::new(FakeAdapter { configured: true }),
            http.clone(),
            &policy,
        );

        client.fetch_page(1, 20).await.expect("first fetch passes");
        let error = client.fetch_page(2, 20).await.expect_err("gate denies");
        assert_eq!(error.kind(), FetchErrorKind::RateLimited);
        assert_eq!(http.calls(), 1);
        assert_eq!(client.stats().rate_limit_errors, 1);
        assert_eq!(client.stats().total_requests, 1);
    }

    #[tokio::test]
    async fn reset_clears_stats_and_breaker() {
        let (client, _http) = client_with(
            vec![Err(HttpError::connect("down"))],
            RetryConfig::no_retry(),
            CircuitBreakerConfig {
                failure_threshold: 1,
                cooldown: Duration::from_secs(60),
            },
        );

        let _ = client.fetch_page(1, 20).await;
        assert_eq!(client.circuit_state(), CircuitState::Open);

        client.reset();
        assert_eq!(client.circuit_state(), CircuitState::Closed);
        assert_eq!(client.stats(), RequestStats::default());
    }
}
