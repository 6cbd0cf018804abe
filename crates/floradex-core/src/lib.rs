//! # Floradex Core
//!
//! Resilient provider clients and the progressive sync engine for the
//! floradex botanical content platform.
//!
//! ## Overview
//!
//! Floradex ingests reference data from rate-limited, occasionally
//! unreliable third-party botanical APIs. This crate provides everything
//! with real failure-mode reasoning in that pipeline:
//!
//! - **Rate gate** bounding outbound request rate per provider
//! - **Retry policy** with failure classification and jittered backoff
//! - **Circuit breaker** guarding each provider independently
//! - **Provider client** composing the three around one HTTP surface
//! - **Progressive sync engine** with durable per-page checkpoints
//! - **Health scorer** deriving a 0-100 reliability score
//! - **Alert dispatcher** with edge detection, cooldown, and fan-out
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapter`] | Provider adapter contract and fetch errors |
//! | [`adapters`] | Provider adapters (Trefle, Permapeople) |
//! | [`alert`] | Alert dispatcher, watcher, and notification channels |
//! | [`circuit_breaker`] | Circuit breaker for resilient calls |
//! | [`client`] | Resilient per-provider client |
//! | [`domain`] | Domain models (PlantRecord, PlantPatch, drafts) |
//! | [`error`] | Core error types |
//! | [`health`] | Health scoring over request stats |
//! | [`heuristic`] | Candidate acceptance rules |
//! | [`http_client`] | HTTP client abstraction |
//! | [`provider_policy`] | Per-provider quotas and thresholds |
//! | [`rate_limit`] | Local request-rate gate |
//! | [`retry`] | Retry classification and backoff |
//! | [`stats`] | Per-provider request counters |
//! | [`sync`] | Progressive sync engine and store seams |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ Cron / Admin CLI │
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │   Sync Engine    │────▶│ Checkpoint Store │
//! └────────┬─────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ Provider Client  │────▶│ Rate Gate        │
//! │ (per provider)   │────▶│ Circuit Breaker  │
//! └────────┬─────────┘     │ Retry Policy     │
//!          │               └──────────────────┘
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ Provider Adapter │────▶│ HTTP Client      │
//! │ (Trefle, …)      │     │ (reqwest/mock)   │
//! └──────────────────┘     └──────────────────┘
//! ```
//!
//! A separate periodic watcher polls each client's stats and circuit state,
//! scores them, and feeds the alert dispatcher.
//!
//! ## Security
//!
//! - API credentials are read from environment variables only (never logged)
//! - Upstream payloads are validated at the adapter boundary; unexpected
//!   shapes are errors, not silent nulls

pub mod adapter;
pub mod adapters;
pub mod alert;
pub mod circuit_breaker;
pub mod client;
pub mod domain;
pub mod error;
pub mod health;
pub mod heuristic;
pub mod http_client;
pub mod provider;
pub mod provider_policy;
pub mod rate_limit;
pub mod retry;
pub mod stats;
pub mod sync;

// Re-export commonly used types at crate root for convenience

// Adapter contract and implementations
pub use adapter::{FetchError, FetchErrorKind, Page, ProviderAdapter};
pub use adapters::{PermapeopleAdapter, TrefleAdapter};

// Alerting
pub use alert::{
    Alert, AlertConfig, AlertDispatcher, AlertEvent, AlertSeverity, AlertSink, AlertWatcher,
    Clock, Notifier, SystemClock, WatcherHandle, WebhookNotifier,
};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Provider client
pub use client::ProviderClient;

// Domain models
pub use domain::{NewDraft, PlantPatch, PlantRecord, Provenance, StaleDraft, UtcDateTime};

// Error types
pub use error::{CoreError, ValidationError};

// Health scoring
pub use health::{score as health_score, HealthScore, HealthStatus};

// Candidate heuristic
pub use heuristic::{CandidateRules, CandidateVerdict};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

// Provider identifiers and policies
pub use provider::ProviderId;
pub use provider_policy::ProviderPolicy;

// Rate limiting
pub use rate_limit::{RateGate, RateLimits};

// Retry logic
pub use retry::{Backoff, RetryClass, RetryConfig};

// Request stats
pub use stats::{RequestStats, StatsRecorder};

// Sync engine
pub use sync::{
    CheckpointStore, ContentStore, EnrichmentReport, ImportReport, RunStatus, StoreError,
    SyncCheckpoint, SyncConfig, SyncEngine, SyncError,
};
