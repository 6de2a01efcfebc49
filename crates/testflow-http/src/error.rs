use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("request to {0} failed after {1} attempt(s): {2}")]
    RetriesExhausted(String, u32, #[source] reqwest::Error),

    #[error("failed to read response body from {0}: {1}")]
    Body(String, #[source] reqwest::Error),
}
