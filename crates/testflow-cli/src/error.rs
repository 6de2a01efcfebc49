//! CLI-level error aggregation. Every fatal error surfaced before or around
//! a run collapses into one of these variants so `main` has one place to
//! decide an exit code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] testflow_core::config::ConfigError),

    #[error(transparent)]
    Discovery(#[from] testflow_discovery::DiscoveryError),

    #[error(transparent)]
    Suite(#[from] testflow_core::suite::SuiteParseError),

    #[error(transparent)]
    Http(#[from] testflow_http::HttpError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown report format: {0}")]
    Format(String),

    #[error("invalid filter: {0}")]
    Filter(String),

    #[error("'{0}' is not implemented in this engine")]
    NotImplemented(String),
}
