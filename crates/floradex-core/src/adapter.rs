//! Provider adapter contract and the structured fetch error.
//!
//! An adapter knows one provider's HTTP surface: how to build page and
//! enrichment requests and how to validate the raw payloads into normalized
//! domain types. The resilience loop around the transport lives in
//! [`crate::client::ProviderClient`], never in the adapters.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::domain::{PlantPatch, PlantRecord};
use crate::http_client::HttpRequest;
use crate::ProviderId;

/// One fetched page of upstream records. An empty page signals that the
/// provider has no further data.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub page_number: u32,
    pub records: Vec<PlantRecord>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Provider-client error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Credentials are absent; nothing was attempted.
    NotConfigured,
    /// The local rate gate denied the request before any network I/O.
    RateLimited,
    /// The circuit breaker short-circuited the request.
    CircuitOpen,
    /// The request timed out.
    Timeout,
    /// Connection-level failure.
    Network,
    /// Upstream answered HTTP 429.
    UpstreamRateLimited,
    /// Upstream answered 5xx.
    UpstreamServer,
    /// Upstream answered a non-429 4xx.
    UpstreamClient,
    /// The payload did not match the provider's documented shape.
    InvalidResponse,
}

/// Structured error returned by provider clients.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
    status: Option<u16>,
    retry_after: Option<Duration>,
}

impl FetchError {
    pub fn not_configured(provider: ProviderId) -> Self {
        Self {
            kind: FetchErrorKind::NotConfigured,
            message: format!("{provider} credentials are not configured"),
            status: None,
            retry_after: None,
        }
    }

    pub fn rate_limited(provider: ProviderId, retry_in: Duration) -> Self {
        Self {
            kind: FetchErrorKind::RateLimited,
            message: format!(
                "{provider} request quota exhausted; retry in {:.2}s",
                retry_in.as_secs_f64()
            ),
            status: None,
            retry_after: Some(retry_in),
        }
    }

    pub fn circuit_open(provider: ProviderId) -> Self {
        Self {
            kind: FetchErrorKind::CircuitOpen,
            message: format!("{provider} circuit breaker is open; skipping upstream call"),
            status: None,
            retry_after: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Timeout,
            message: message.into(),
            status: None,
            retry_after: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Network,
            message: message.into(),
            status: None,
            retry_after: None,
        }
    }

    pub fn upstream_rate_limited(provider: ProviderId, retry_after: Option<Duration>) -> Self {
        Self {
            kind: FetchErrorKind::UpstreamRateLimited,
            message: format!("{provider} upstream returned status 429"),
            status: Some(429),
            retry_after,
        }
    }

    pub fn upstream_server(provider: ProviderId, status: u16) -> Self {
        Self {
            kind: FetchErrorKind::UpstreamServer,
            message: format!("{provider} upstream returned status {status}"),
            status: Some(status),
            retry_after: None,
        }
    }

    pub fn upstream_client(provider: ProviderId, status: u16) -> Self {
        Self {
            kind: FetchErrorKind::UpstreamClient,
            message: format!("{provider} upstream returned status {status}"),
            status: Some(status),
            retry_after: None,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::InvalidResponse,
            message: message.into(),
            status: None,
            retry_after: None,
        }
    }

    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    /// Upstream backoff hint, present only for 429 responses that carried a
    /// parseable `Retry-After`, and for local rate-gate denials.
    pub const fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            FetchErrorKind::NotConfigured => "fetch.not_configured",
            FetchErrorKind::RateLimited => "fetch.rate_limited",
            FetchErrorKind::CircuitOpen => "fetch.circuit_open",
            FetchErrorKind::Timeout => "fetch.timeout",
            FetchErrorKind::Network => "fetch.network",
            FetchErrorKind::UpstreamRateLimited => "fetch.upstream_rate_limited",
            FetchErrorKind::UpstreamServer => "fetch.upstream_server",
            FetchErrorKind::UpstreamClient => "fetch.upstream_client",
            FetchErrorKind::InvalidResponse => "fetch.invalid_response",
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for FetchError {}

/// One provider's HTTP surface: request construction and boundary parsing.
///
/// Implementations must be `Send + Sync`; they hold credentials and base
/// URLs but no mutable state.
pub trait ProviderAdapter: Send + Sync {
    /// The provider this adapter talks to.
    fn provider(&self) -> ProviderId;

    /// False when credentials are absent; the client then refuses all
    /// operations without attempting network I/O.
    fn is_configured(&self) -> bool;

    /// Build the paginated listing request.
    fn page_request(&self, page: u32, page_size: u32) -> HttpRequest;

    /// Validate and normalize a listing payload. Shape violations are
    /// `InvalidResponse` errors, never silently dropped records.
    fn parse_page(&self, body: &str) -> Result<Vec<PlantRecord>, FetchError>;

    /// Build the single-record enrichment lookup request.
    fn enrich_request(&self, query: &str) -> HttpRequest;

    /// Validate an enrichment payload; `None` means the provider has no
    /// match for the query.
    fn parse_enrich(&self, body: &str) -> Result<Option<PlantPatch>, FetchError>;
}
