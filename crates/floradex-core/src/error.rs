use thiserror::Error;

/// Validation and contract errors exposed by `floradex-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid provider '{value}', expected one of trefle, permapeople")]
    InvalidProvider { value: String },

    #[error("external id cannot be empty")]
    EmptyExternalId,
    #[error("scientific name cannot be empty")]
    EmptyScientificName,

    #[error("enrichment query cannot be empty")]
    EmptyQuery,
    #[error("page size must be greater than zero")]
    ZeroPageSize,

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
