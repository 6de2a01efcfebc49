use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExprError {
    #[error("syntax error in expression: {0}")]
    Syntax(String),

    #[error("expression exceeded its {0}ms time budget")]
    Timeout(u64),

    #[error("expression exceeded a resource bound: {0}")]
    Resource(String),

    #[error("expression evaluation failed: {0}")]
    Runtime(String),

    #[error("failed to convert {what} between JSON and the script runtime: {source}")]
    Conversion {
        what: &'static str,
        #[source]
        source: Box<rhai::EvalAltResult>,
    },
}
