use thiserror::Error;

/// Crate-wide error taxonomy.
///
/// `Validation` and `Credential` are raised before any side effect is
/// performed; everything else can surface mid-operation, after the raising
/// service has already rolled its optimistic work back.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Credential error: {0}")]
    Credential(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    pub fn validation(message: impl Into<String>) -> Self {
        SyncError::Validation(message.into())
    }

    pub fn credential(message: impl Into<String>) -> Self {
        SyncError::Credential(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SyncError::Internal(message.into())
    }

    /// True for failures raised before any side effect was performed.
    pub fn is_validation_class(&self) -> bool {
        matches!(self, SyncError::Validation(_) | SyncError::Credential(_))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout(err.to_string())
        } else {
            SyncError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        SyncError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
