use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("pre_script failed: {0}")]
    PreScript(String),

    #[error("post_script failed: {0}")]
    PostScript(String),

    #[error("failed to interpolate request: {0}")]
    Interpolation(#[from] testflow_vars::VarsError),

    #[error("request failed: {0}")]
    Request(#[from] testflow_http::HttpError),

    #[error("capture {name:?} duplicates an existing binding in this step (not marked overwrite)")]
    DuplicateCapture { name: String },

    #[error("capture {name:?} failed to extract a value: {reason}")]
    CaptureFailed { name: String, reason: String },

    #[error("scenario condition failed to evaluate: {0}")]
    ScenarioCondition(String),

    #[error("iterate.over did not evaluate to an array")]
    IterationType,

    #[error("invalid regex in assertion rule {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("suite {0} was invoked via `call` but was not found among loaded suites")]
    CalledSuiteNotFound(String),

    #[error("`call` cycle detected: {0}")]
    CallCycle(String),
}
