//! Test framework error types.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// A retried operation never succeeded within its attempt budget.
    #[error("retry error: {0}")]
    Retry(String),

    /// Fixture creation or cleanup failure.
    #[error("fixture error: {0}")]
    Fixture(String),

    /// Assertion failure with context.
    #[error("assertion error: {0}")]
    Assertion(String),

    /// Observability / tracing assertion failure.
    #[error("observability error: {0}")]
    Observability(String),

    /// Operation timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
