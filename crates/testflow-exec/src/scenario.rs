//! Scenario Engine: evaluates each scenario's condition once against the
//! full variable snapshot (which includes the step's `response`/`request`
//! bindings) and folds the chosen branch's assertions/captures into the
//! step, in declaration order, additively across scenarios.

use serde_json::Value;

use testflow_core::suite::{AssertionRule, CaptureSpec, Scenario};
use testflow_vars::{Interpolator, ScriptEvaluator, VariableSource};

use crate::error::ExecError;
use crate::result::ScenarioMeta;

pub struct ScenarioOutcome {
    pub meta: ScenarioMeta,
    pub assertions: Vec<(String, AssertionRule)>,
    pub captures: Vec<(String, CaptureSpec)>,
}

/// Evaluate one scenario's condition and fold in whichever branch matched.
/// `condition` supports the `{{ }}` reference grammar in addition to a bare
/// sandboxed expression: tokens are interpolated first (string values come
/// out quoted so the result still parses), then, unless the whole condition
/// collapsed to a single already-resolved value, the result is handed to
/// the expression evaluator.
pub fn evaluate(
    scenario: &Scenario,
    interpolator: &Interpolator<'_>,
    evaluator: &dyn ScriptEvaluator,
    vars: &dyn VariableSource,
) -> Result<ScenarioOutcome, ExecError> {
    let interpolated = interpolator
        .interpolate_expr(&scenario.condition, vars, 0)
        .map_err(|e| ExecError::ScenarioCondition(e.to_string()))?;
    let matched = match interpolated {
        Value::String(expr) => evaluator
            .evaluate(&expr, vars)
            .map(|v| is_truthy(&v))
            .map_err(|e| ExecError::ScenarioCondition(e.to_string()))?,
        other => is_truthy(&other),
    };

    let branch = if matched { &scenario.then } else { &scenario.r#else };
    let branch_taken = if matched { "then" } else { "else" };

    let (assertions, captures) = match branch {
        Some(b) => (
            b.assert.clone().into_iter().collect::<Vec<_>>(),
            b.capture.clone().into_iter().collect::<Vec<_>>(),
        ),
        None => (Vec::new(), Vec::new()),
    };

    let meta = ScenarioMeta {
        condition: scenario.condition.clone(),
        matched,
        executed: branch.is_some(),
        branch_taken: branch.as_ref().map(|_| branch_taken.to_string()),
        assertions_contributed: assertions.len(),
        captures_contributed: captures.len(),
    };

    Ok(ScenarioOutcome { meta, assertions, captures })
}

/// Fold every scenario's outcome into one ordered list of assertions and
/// captures, additive across scenarios per their declaration order.
pub fn fold_all(
    scenarios: &[Scenario],
    interpolator: &Interpolator<'_>,
    evaluator: &dyn ScriptEvaluator,
    vars: &dyn VariableSource,
) -> Result<(Vec<ScenarioMeta>, Vec<(String, AssertionRule)>, Vec<(String, CaptureSpec)>), ExecError> {
    let mut metas = Vec::with_capacity(scenarios.len());
    let mut assertions = Vec::new();
    let mut captures = Vec::new();

    for scenario in scenarios {
        let outcome = evaluate(scenario, interpolator, evaluator, vars)?;
        metas.push(outcome.meta);
        assertions.extend(outcome.assertions);
        captures.extend(outcome.captures);
    }

    Ok((metas, assertions, captures))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
