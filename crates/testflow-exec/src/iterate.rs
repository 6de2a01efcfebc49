//! Iteration Engine: expands `iterate: {over, as}` or `iterate: {count, as}`
//! into a sequential run of the step body, one per element.

use serde_json::Value;

use testflow_core::suite::IterateSpec;
use testflow_vars::{Interpolator, ScriptEvaluator, VariableSource};

use crate::error::ExecError;

/// The variable name each iteration binds its element under.
pub fn binding_name(spec: &IterateSpec) -> &str {
    match spec {
        IterateSpec::Over { r#as, .. } => r#as,
        IterateSpec::Count { r#as, .. } => r#as,
    }
}

/// Resolve the list of elements to iterate over. `over` supports the
/// `{{ }}` reference grammar (e.g. `"{{items}}"` binds straight to an
/// already-resolved array) as well as a bare sandboxed expression
/// (`"[1, 2, 3]"`); either way the result must be an array. `count`
/// synthesizes `[0, 1, ..., N-1]`.
pub fn resolve_items(
    spec: &IterateSpec,
    interpolator: &Interpolator<'_>,
    evaluator: &dyn ScriptEvaluator,
    vars: &dyn VariableSource,
) -> Result<Vec<Value>, ExecError> {
    match spec {
        IterateSpec::Over { over, .. } => {
            let interpolated = interpolator
                .interpolate_expr(over, vars, 0)
                .map_err(|_| ExecError::IterationType)?;
            let evaluated = match interpolated {
                Value::String(expr) => evaluator.evaluate(&expr, vars).map_err(|_| ExecError::IterationType)?,
                other => other,
            };
            match evaluated {
                Value::Array(items) => Ok(items),
                _ => Err(ExecError::IterationType),
            }
        }
        IterateSpec::Count { count, .. } => Ok((0..*count).map(Value::from).collect()),
    }
}
