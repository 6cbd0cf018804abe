//! Alert dispatch: edge-detecting observer over circuit state and health,
//! with per-provider cooldown, a bounded in-memory history, and best-effort
//! channel fan-out.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::circuit_breaker::CircuitState;
use crate::client::ProviderClient;
use crate::domain::UtcDateTime;
use crate::health::{self, HealthScore, HealthStatus};
use crate::stats::RequestStats;
use crate::sync::StoreError;
use crate::ProviderId;

/// Alert severity, ordered least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// The observed edge that fired an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertEvent {
    CircuitOpened,
    CircuitHalfOpen,
    CircuitClosed,
    HealthDegraded,
    HealthRecovered,
}

impl AlertEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CircuitOpened => "circuit_opened",
            Self::CircuitHalfOpen => "circuit_half_open",
            Self::CircuitClosed => "circuit_closed",
            Self::HealthDegraded => "health_degraded",
            Self::HealthRecovered => "health_recovered",
        }
    }
}

/// One dispatched alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub provider: ProviderId,
    pub severity: AlertSeverity,
    pub event: AlertEvent,
    pub circuit_state: CircuitState,
    pub health_score: u8,
    pub stats: RequestStats,
    pub timestamp: UtcDateTime,
    pub channels_notified: Vec<String>,
}

/// Best-effort notification channels. Failures are logged and swallowed;
/// observability must never become a cause of ingestion failure.
pub trait Notifier: Send + Sync {
    fn send_email<'a>(
        &'a self,
        to: &'a str,
        subject: &'a str,
        body: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;

    fn send_webhook<'a>(
        &'a self,
        url: &'a str,
        payload: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;
}

/// Webhook-only notifier over the transport seam. Email requires an SMTP
/// relay this deployment does not carry, so `send_email` always reports a
/// delivery failure, which the dispatcher logs and swallows.
pub struct WebhookNotifier {
    http: Arc<dyn crate::http_client::HttpClient>,
}

impl WebhookNotifier {
    pub fn new(http: Arc<dyn crate::http_client::HttpClient>) -> Self {
        Self { http }
    }
}

impl Notifier for WebhookNotifier {
    fn send_email<'a>(
        &'a self,
        _to: &'a str,
        _subject: &'a str,
        _body: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>> {
        Box::pin(async move { Err(String::from("email transport is not configured")) })
    }

    fn send_webhook<'a>(
        &'a self,
        url: &'a str,
        payload: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>> {
        Box::pin(async move {
            let request = crate::http_client::HttpRequest::post(url)
                .with_header("content-type", "application/json")
                .with_body(payload.to_string());

            let response = self
                .http
                .execute(request)
                .await
                .map_err(|e| e.message().to_owned())?;

            if response.is_success() {
                Ok(())
            } else {
                Err(format!("webhook endpoint returned status {}", response.status))
            }
        })
    }
}

/// Durable append-only alert log. Optional; append failures are logged and
/// swallowed like any other delivery failure.
pub trait AlertSink: Send + Sync {
    fn append(&self, alert: &Alert) -> Result<(), StoreError>;
}

/// Injectable monotonic clock so tests can step time instead of sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock implementation used in production.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Dispatcher tuning.
#[derive(Debug, Clone)]
pub struct AlertConfig {
    /// Minimum spacing between non-critical alerts per provider.
    pub cooldown: Duration,
    /// Lifetime trip count at which a recovery alert escalates from info to
    /// warning.
    pub trip_escalation_threshold: u64,
    /// Bounded in-memory history size across all providers.
    pub history_limit: usize,
    pub email_to: Option<String>,
    pub webhook_url: Option<String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(300),
            trip_escalation_threshold: 3,
            history_limit: 200,
            email_to: None,
            webhook_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ProviderAlertState {
    last_circuit: CircuitState,
    last_healthy: bool,
    last_sent_at: Option<Instant>,
}

#[derive(Default)]
struct DispatchState {
    history: VecDeque<Alert>,
    providers: HashMap<ProviderId, ProviderAlertState>,
}

/// Edge-detecting alert dispatcher.
///
/// `observe` compares the current circuit state and health status against
/// the last-known values per provider and fires only on change. The first
/// observation of a provider seeds the baseline without firing.
pub struct AlertDispatcher {
    config: AlertConfig,
    clock: Arc<dyn Clock>,
    notifier: Option<Arc<dyn Notifier>>,
    sink: Option<Arc<dyn AlertSink>>,
    state: Mutex<DispatchState>,
}

impl AlertDispatcher {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            notifier: None,
            sink: None,
            state: Mutex::new(DispatchState::default()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Feed one observation; returns the alerts that actually fired.
    pub async fn observe(
        &self,
        provider: ProviderId,
        circuit: CircuitState,
        health: &HealthScore,
        stats: RequestStats,
    ) -> Vec<Alert> {
        let now = self.clock.now();
        let healthy = health.status == HealthStatus::Healthy;

        let pending = {
            let mut state = self.state.lock().expect("alert state lock");
            let Some(previous) = state.providers.get(&provider).copied() else {
                state.providers.insert(
                    provider,
                    ProviderAlertState {
                        last_circuit: circuit,
                        last_healthy: healthy,
                        last_sent_at: None,
                    },
                );
                return Vec::new();
            };

            let mut pending = Vec::new();

            if circuit != previous.last_circuit {
                pending.push(self.circuit_event(circuit, &stats));
            }
            if healthy != previous.last_healthy {
                pending.push(if healthy {
                    (AlertEvent::HealthRecovered, AlertSeverity::Info)
                } else {
                    (AlertEvent::HealthDegraded, AlertSeverity::Warning)
                });
            }

            let cooled_down = previous
                .last_sent_at
                .map(|sent| now.duration_since(sent) >= self.config.cooldown)
                .unwrap_or(true);

            let deliverable: Vec<(AlertEvent, AlertSeverity)> = pending
                .into_iter()
                .filter(|(event, severity)| {
                    let pass = *severity == AlertSeverity::Critical || cooled_down;
                    if !pass {
                        debug!(
                            provider = %provider,
                            event = event.as_str(),
                            "alert suppressed by cooldown"
                        );
                    }
                    pass
                })
                .collect();

            let entry = state
                .providers
                .get_mut(&provider)
                .expect("provider state just read");
            entry.last_circuit = circuit;
            entry.last_healthy = healthy;
            if !deliverable.is_empty() {
                entry.last_sent_at = Some(now);
            }

            deliverable
        };

        let mut fired = Vec::new();
        for (event, severity) in pending {
            let alert = self
                .fire(provider, event, severity, circuit, health, stats)
                .await;
            fired.push(alert);
        }

        fired
    }

    fn circuit_event(
        &self,
        circuit: CircuitState,
        stats: &RequestStats,
    ) -> (AlertEvent, AlertSeverity) {
        match circuit {
            CircuitState::Open => (AlertEvent::CircuitOpened, AlertSeverity::Critical),
            CircuitState::HalfOpen => (AlertEvent::CircuitHalfOpen, AlertSeverity::Warning),
            CircuitState::Closed => {
                let severity = if stats.circuit_breaker_trips
                    >= self.config.trip_escalation_threshold
                {
                    AlertSeverity::Warning
                } else {
                    AlertSeverity::Info
                };
                (AlertEvent::CircuitClosed, severity)
            }
        }
    }

    async fn fire(
        &self,
        provider: ProviderId,
        event: AlertEvent,
        severity: AlertSeverity,
        circuit: CircuitState,
        health: &HealthScore,
        stats: RequestStats,
    ) -> Alert {
        let mut alert = Alert {
            id: uuid::Uuid::new_v4().to_string(),
            provider,
            severity,
            event,
            circuit_state: circuit,
            health_score: health.score,
            stats,
            timestamp: UtcDateTime::now(),
            channels_notified: vec![String::from("log")],
        };

        match severity {
            AlertSeverity::Critical => error!(
                provider = %provider,
                event = event.as_str(),
                score = health.score,
                "provider alert"
            ),
            AlertSeverity::Warning => warn!(
                provider = %provider,
                event = event.as_str(),
                score = health.score,
                "provider alert"
            ),
            AlertSeverity::Info => info!(
                provider = %provider,
                event = event.as_str(),
                score = health.score,
                "provider alert"
            ),
        }

        if let Some(notifier) = &self.notifier {
            self.deliver(notifier.as_ref(), &mut alert).await;
        }

        if let Some(sink) = &self.sink {
            if let Err(sink_error) = sink.append(&alert) {
                warn!(provider = %provider, error = %sink_error, "alert sink append failed");
            }
        }

        let mut state = self.state.lock().expect("alert state lock");
        state.history.push_back(alert.clone());
        while state.history.len() > self.config.history_limit {
            state.history.pop_front();
        }

        alert
    }

    async fn deliver(&self, notifier: &dyn Notifier, alert: &mut Alert) {
        if let Some(to) = &self.config.email_to {
            let subject = format!(
                "[floradex] {} {} for {}",
                alert.severity.as_str(),
                alert.event.as_str(),
                alert.provider
            );
            let body = format!(
                "provider {} reported {} (health score {}, circuit {})",
                alert.provider,
                alert.event.as_str(),
                alert.health_score,
                alert.circuit_state.as_str()
            );
            match notifier.send_email(to, &subject, &body).await {
                Ok(()) => alert.channels_notified.push(String::from("email")),
                Err(delivery_error) => warn!(
                    provider = %alert.provider,
                    error = %delivery_error,
                    "email delivery failed"
                ),
            }
        }

        if let Some(url) = &self.config.webhook_url {
            let payload = serde_json::to_value(&*alert).unwrap_or_default();
            match notifier.send_webhook(url, &payload).await {
                Ok(()) => alert.channels_notified.push(String::from("webhook")),
                Err(delivery_error) => warn!(
                    provider = %alert.provider,
                    error = %delivery_error,
                    "webhook delivery failed"
                ),
            }
        }
    }

    /// Most recent alerts, oldest first.
    pub fn history(&self) -> Vec<Alert> {
        let state = self.state.lock().expect("alert state lock");
        state.history.iter().cloned().collect()
    }
}

/// Periodic watcher polling provider clients and feeding the dispatcher.
///
/// `check_once` is public so tests and admin commands can step it without a
/// timer; `spawn` wires it to a tokio interval with explicit shutdown.
pub struct AlertWatcher {
    dispatcher: Arc<AlertDispatcher>,
    clients: Vec<Arc<ProviderClient>>,
    interval: Duration,
}

impl AlertWatcher {
    pub fn new(
        dispatcher: Arc<AlertDispatcher>,
        clients: Vec<Arc<ProviderClient>>,
        interval: Duration,
    ) -> Self {
        Self {
            dispatcher,
            clients,
            interval,
        }
    }

    /// Poll every provider once.
    pub async fn check_once(&self) {
        for client in &self.clients {
            let stats = client.stats();
            let health = health::score(&stats);
            self.dispatcher
                .observe(client.provider(), client.circuit_state(), &health, stats)
                .await;
        }
    }

    /// Run the periodic loop until shutdown is requested.
    pub fn spawn(self) -> WatcherHandle {
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.check_once().await,
                    result = shutdown_rx.changed() => {
                        if result.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        WatcherHandle {
            shutdown_tx,
            handle,
        }
    }
}

/// Handle for stopping a spawned watcher.
pub struct WatcherHandle {
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    handle: tokio::task::JoinHandle<()>,
}

impl WatcherHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}
