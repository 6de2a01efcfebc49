//! Wires the sandbox into the `$js.` interpolation directive and the
//! `pre_script`/`post_script` hooks, via `testflow_vars::ScriptEvaluator`.

use serde_json::Value;
use testflow_vars::{ScriptEvaluator, VariableSource, VarsError};

use crate::sandbox::Sandbox;

pub struct Evaluator {
    sandbox: Sandbox,
}

impl Evaluator {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            sandbox: Sandbox::new(timeout_ms),
        }
    }

    /// Run `pre_script`/`post_script`: same sandbox, but the return value is
    /// usually discarded except for its truthiness/error.
    pub fn run_script(&self, expression: &str, vars: &dyn VariableSource) -> Result<Value, VarsError> {
        self.evaluate(expression, vars)
    }
}

impl ScriptEvaluator for Evaluator {
    fn evaluate(&self, expression: &str, vars: &dyn VariableSource) -> Result<Value, VarsError> {
        let snapshot = vars.snapshot();
        let response = vars.resolve("response");
        let request = vars.resolve("request");
        self.sandbox
            .evaluate(expression, snapshot, response, request)
            .map_err(|e| VarsError::Script(e.to_string()))
    }
}
