//! Hard-bounded rhai sandbox: no I/O, no module loading, wall-clock and
//! resource ceilings enforced per evaluation.

use std::time::{Duration, Instant};

use rhai::{Dynamic, Engine, EvalAltResult, Scope};
use serde_json::Value;

use crate::error::ExprError;

const DEFAULT_TIMEOUT_MS: u64 = 250;
const MAX_OPERATIONS: u64 = 200_000;
const MAX_STRING_SIZE: usize = 64 * 1024;
const MAX_ARRAY_SIZE: usize = 10_000;
const MAX_MAP_SIZE: usize = 10_000;
const MAX_CALL_DEPTH: usize = 32;

/// Evaluates one restricted expression against a read-only `vars` /
/// `response` / `request` environment. Every evaluation gets a fresh
/// `rhai::Engine`; engines are cheap and this keeps resource limits and the
/// progress-based timeout from leaking between calls.
pub struct Sandbox {
    timeout: Duration,
}

impl Sandbox {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(if timeout_ms == 0 { DEFAULT_TIMEOUT_MS } else { timeout_ms }),
        }
    }

    pub fn evaluate(
        &self,
        expression: &str,
        vars: Value,
        response: Option<Value>,
        request: Option<Value>,
    ) -> Result<Value, ExprError> {
        let mut engine = Engine::new();
        engine.set_max_operations(MAX_OPERATIONS);
        engine.set_max_expr_depths(MAX_CALL_DEPTH, MAX_CALL_DEPTH);
        engine.set_max_string_size(MAX_STRING_SIZE);
        engine.set_max_array_size(MAX_ARRAY_SIZE);
        engine.set_max_map_size(MAX_MAP_SIZE);

        let start = Instant::now();
        let timeout = self.timeout;
        engine.on_progress(move |_ops| {
            if start.elapsed() > timeout {
                Some(Dynamic::from("__testflow_expression_timeout__"))
            } else {
                None
            }
        });

        let mut scope = Scope::new();
        scope.push_constant("vars", to_dynamic("vars", vars)?);
        scope.push_constant(
            "response",
            to_dynamic("response", response.unwrap_or(Value::Null))?,
        );
        scope.push_constant(
            "request",
            to_dynamic("request", request.unwrap_or(Value::Null))?,
        );

        let elapsed_guard = Instant::now();
        match engine.eval_with_scope::<Dynamic>(&mut scope, expression) {
            Ok(value) => from_dynamic(value),
            Err(err) => Err(classify(*err, elapsed_guard.elapsed(), self.timeout)),
        }
    }
}

fn to_dynamic(what: &'static str, value: Value) -> Result<Dynamic, ExprError> {
    rhai::serde::to_dynamic(&value).map_err(|source| ExprError::Conversion { what, source })
}

fn from_dynamic(value: Dynamic) -> Result<Value, ExprError> {
    if let Some(marker) = value.clone().try_cast::<String>() {
        if marker == "__testflow_expression_timeout__" {
            return Err(ExprError::Timeout(0));
        }
    }
    rhai::serde::from_dynamic(&value).map_err(|source| ExprError::Conversion {
        what: "result",
        source,
    })
}

fn classify(err: EvalAltResult, elapsed: Duration, budget: Duration) -> ExprError {
    match err {
        EvalAltResult::ErrorParsing(..) => ExprError::Syntax(err.to_string()),
        EvalAltResult::ErrorTerminated(..) => ExprError::Timeout(budget.as_millis() as u64),
        EvalAltResult::ErrorTooManyOperations(..) => ExprError::Resource(err.to_string()),
        EvalAltResult::ErrorDataTooLarge(..) => ExprError::Resource(err.to_string()),
        EvalAltResult::ErrorStackOverflow(..) => ExprError::Resource(err.to_string()),
        _ if elapsed >= budget => ExprError::Timeout(budget.as_millis() as u64),
        other => ExprError::Runtime(other.to_string()),
    }
}
