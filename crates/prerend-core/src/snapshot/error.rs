use thiserror::Error;

/// Why a single route could not be captured.
#[derive(Debug, Error)]
pub enum FetchCause {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("failed to read body: {0}")]
    Body(String),
}

#[derive(Debug, Error)]
#[error("failed to fetch '{route}' from {url}: {cause}")]
pub struct FetchError {
    pub route: String,
    pub url: String,
    #[source]
    pub cause: FetchCause,
}
