//! Capture Engine: extracts values out of a step's response/request context
//! and writes them into scope, optionally promoted to suite or global scope.

use std::collections::HashSet;

use serde_json::Value;

use testflow_core::suite::{CaptureSpec, PromoteScope};
use testflow_core::value::get_path;
use testflow_vars::{ScopeLayer, Scopes, ScriptEvaluator, VariableSource};

use crate::error::ExecError;

/// Resolve one capture extractor against `{status_code, headers, body,
/// response_time_ms}`. `$js.<expr>` extractors run through the sandboxed
/// evaluator instead of a plain path lookup.
pub fn extract(
    name: &str,
    spec: &CaptureSpec,
    response_context: &Value,
    evaluator: Option<&dyn ScriptEvaluator>,
    vars: &dyn VariableSource,
) -> Result<Value, ExecError> {
    let extractor = spec.extractor();

    if let Some(expr) = extractor.strip_prefix("$js.") {
        let evaluator = evaluator.ok_or_else(|| ExecError::CaptureFailed {
            name: name.to_string(),
            reason: "no script evaluator configured for $js capture".to_string(),
        })?;
        return evaluator.evaluate(expr, vars).map_err(|e| ExecError::CaptureFailed {
            name: name.to_string(),
            reason: e.to_string(),
        });
    }

    get_path(response_context, extractor)
        .cloned()
        .ok_or_else(|| ExecError::CaptureFailed {
            name: name.to_string(),
            reason: format!("field path {extractor:?} did not resolve"),
        })
}

/// Write a captured value into the step's own scope, and promote it to
/// suite/global scope if the capture rule asks for it. `captured_this_step`
/// tracks names already captured in the current step so a second write
/// without `overwrite` is rejected rather than silently clobbering.
pub fn write(
    scopes: &mut Scopes,
    captured_this_step: &mut HashSet<String>,
    name: &str,
    value: Value,
    spec: &CaptureSpec,
) -> Result<(), ExecError> {
    if captured_this_step.contains(name) && !spec.overwrite() {
        return Err(ExecError::DuplicateCapture { name: name.to_string() });
    }

    scopes.set(ScopeLayer::Step, name, value.clone());
    captured_this_step.insert(name.to_string());

    match spec.promote() {
        Some(PromoteScope::Suite) => scopes.set(ScopeLayer::Suite, name, value),
        Some(PromoteScope::Global) => scopes.set(ScopeLayer::Global, name, value),
        None => {}
    }

    Ok(())
}
