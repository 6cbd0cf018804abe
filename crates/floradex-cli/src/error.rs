use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] floradex_core::ValidationError),

    #[error("provider {0} is not configured; set its API credentials")]
    NotConfigured(floradex_core::ProviderId),

    #[error("store error: {0}")]
    Store(#[from] floradex_store::BackendError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<floradex_core::SyncError> for CliError {
    fn from(error: floradex_core::SyncError) -> Self {
        match error {
            floradex_core::SyncError::NotConfigured(provider) => Self::NotConfigured(provider),
            floradex_core::SyncError::Store(store) => Self::Command(store.to_string()),
        }
    }
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::NotConfigured(_) => 3,
            Self::Store(_) | Self::Command(_) | Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}
