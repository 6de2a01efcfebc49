use thiserror::Error;

#[derive(Debug, Error)]
pub enum VarsError {
    #[error("variable {0:?} did not resolve in any scope")]
    Resolution(String),

    #[error("environment variable {0:?} is not set and no default was given")]
    EnvNotSet(String),

    #[error("unknown faker method {0:?}")]
    UnknownFaker(String),

    #[error("interpolation of {0:?} did not terminate within {1} levels")]
    InterpolationCycle(String, u32),

    #[error("malformed interpolation token {0:?}")]
    MalformedToken(String),

    #[error("script evaluation failed: {0}")]
    Script(String),
}
