use thiserror::Error;

/// Application-wide error types for the harvester.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// URL points outside the allowed domains.
    #[error("Offsite URL refused: {0}")]
    Offsite(String),

    /// Detail URL carries no digits, so no job id can be derived.
    #[error("Job ID not found in URL: {0}")]
    MissingJobId(String),

    /// Site registry or crawl configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The downstream sink rejected a record.
    #[error("Sink error: {0}")]
    SinkError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error came from fetching a page.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_)
                | AppError::NetworkError(_)
                | AppError::Timeout(_)
                | AppError::Offsite(_)
        )
    }
}
