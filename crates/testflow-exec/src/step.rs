//! Step Executor state machine: Ready -> Interpolate -> Request -> Capture
//! -> Scenarios -> Assert -> Post-script -> Done. No stage short-circuits
//! assertion evaluation: every assertion in a step is evaluated so the
//! `StepResult` can enumerate every failure, not just the first.

use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde_json::{json, Value};

use testflow_core::suite::{AssertionRule, CaptureSpec, Step};
use testflow_vars::{FakerProvider, Interpolator, ScopeLayer, Scopes, ScriptEvaluator};
use testflow_http::{HttpClient, RequestSpecRuntime, RetryPolicy};

use crate::assert::AssertionEngine;
use crate::capture;
use crate::error::ExecError;
use crate::iterate;
use crate::result::{RecordedAttempt, ScenarioMeta, Status, StepResult};
use crate::scenario;

/// Everything the executor needs that isn't owned by the step itself.
pub struct StepContext<'a> {
    pub scopes: &'a mut Scopes,
    pub faker: &'a FakerProvider,
    pub evaluator: &'a (dyn ScriptEvaluator + Send + Sync),
    pub http: &'a HttpClient,
    pub retry: RetryPolicy,
    pub base_url: Option<String>,
    pub strict_interpolation: bool,
    pub continue_on_capture_failure: bool,
    pub default_timeout: Duration,
}

pub struct StepExecutor;

impl StepExecutor {
    /// Run one step, including its iterations if it declares `iterate`.
    pub async fn execute(step: &Step, ctx: &mut StepContext<'_>) -> StepResult {
        let start = Instant::now();
        let mut assert_engine = AssertionEngine::new();

        if let Some(expr) = &step.pre_script {
            if let Err(e) = ctx.evaluator.evaluate(expr, ctx.scopes) {
                let mut result = StepResult::new(step.name.clone());
                result.status = Status::Failure;
                result.error_message = Some(format!("pre_script failed: {e}"));
                result.duration_ms = elapsed_ms(start);
                return result;
            }
        }

        let interpolator = Interpolator::new(ctx.faker, Some(ctx.evaluator), ctx.strict_interpolation);

        let mut result = if let Some(iter_spec) = &step.iterate {
            Self::execute_iterations(step, ctx, iter_spec, &interpolator, &mut assert_engine).await
        } else {
            Self::execute_body(step, &step.name, ctx, &interpolator, &mut assert_engine).await
        };

        if let Some(expr) = &step.post_script {
            if let Err(e) = ctx.evaluator.evaluate(expr, ctx.scopes) {
                result.status = Status::Failure;
                result.error_message = Some(format!("post_script failed: {e}"));
            }
        }

        result.duration_ms = elapsed_ms(start);
        result.finalize_status();
        result
    }

    async fn execute_iterations(
        step: &Step,
        ctx: &mut StepContext<'_>,
        iter_spec: &testflow_core::suite::IterateSpec,
        interpolator: &Interpolator<'_>,
        assert_engine: &mut AssertionEngine,
    ) -> StepResult {
        let mut parent = StepResult::new(step.name.clone());

        let items = match iterate::resolve_items(iter_spec, interpolator, ctx.evaluator, ctx.scopes) {
            Ok(items) => items,
            Err(e) => {
                parent.status = Status::Failure;
                parent.error_message = Some(e.to_string());
                return parent;
            }
        };

        let binding = iterate::binding_name(iter_spec).to_string();
        for (idx, item) in items.into_iter().enumerate() {
            ctx.scopes.set(ScopeLayer::Iteration, &binding, item);
            let label = format!("{}[{idx}]", step.name);
            let child = Self::execute_body(step, &label, ctx, interpolator, assert_engine).await;
            parent.iterations.push(child);
        }

        parent
    }

    async fn execute_body(
        step: &Step,
        label: &str,
        ctx: &mut StepContext<'_>,
        interpolator: &Interpolator<'_>,
        assert_engine: &mut AssertionEngine,
    ) -> StepResult {
        let mut result = StepResult::new(label.to_string());

        let response_context = if let Some(request) = &step.request {
            let runtime = match build_request(request, interpolator, ctx) {
                Ok(runtime) => runtime,
                Err(e) => {
                    result.status = Status::Failure;
                    result.error_message = Some(format!("failed to interpolate request: {e}"));
                    return result;
                }
            };

            result.request = Some(json!({
                "method": runtime.method,
                "url": runtime.url,
                "headers": runtime.headers,
                "query": runtime.query,
                "body": runtime.body,
            }));
            ctx.scopes.set(ScopeLayer::Step, "request", result.request.clone().unwrap());

            match ctx.http.execute(&runtime, &ctx.retry).await {
                Ok(response) => {
                    result.attempts = response.attempts.iter().cloned().map(RecordedAttempt::from).collect();
                    let context = json!({
                        "status_code": response.status_code,
                        "headers": response.headers,
                        "body": response.body,
                        "response_time_ms": response.duration_ms,
                    });
                    result.response = Some(context.clone());
                    ctx.scopes.set(ScopeLayer::Step, "response", context.clone());
                    context
                }
                Err(e) => {
                    tracing::warn!(step = %label, error = %e, "request failed");
                    result.status = Status::Failure;
                    result.error_message = Some(format!("request failed: {e}"));
                    return result;
                }
            }
        } else {
            Value::Null
        };

        let mut captured_this_step: HashSet<String> = HashSet::new();
        if !run_captures(&step.capture, &response_context, ctx, &mut captured_this_step, &mut result)
            && !ctx.continue_on_capture_failure
        {
            return result;
        }

        let (metas, scenario_assertions, scenario_captures): (Vec<ScenarioMeta>, Vec<(String, AssertionRule)>, Vec<(String, CaptureSpec)>) =
            match scenario::fold_all(&step.scenarios, interpolator, ctx.evaluator, ctx.scopes) {
                Ok(outcome) => outcome,
                Err(e) => {
                    result.status = Status::Failure;
                    result.error_message = Some(e.to_string());
                    return result;
                }
            };
        result.scenarios_meta = metas;

        let scenario_capture_specs: IndexMap<String, CaptureSpec> = scenario_captures.into_iter().collect();
        run_captures(&scenario_capture_specs, &response_context, ctx, &mut captured_this_step, &mut result);

        for (field_path, rule) in step.assert.iter().map(|(k, v)| (k.clone(), v.clone())).chain(scenario_assertions) {
            match assert_engine.evaluate(&field_path, &rule, &response_context) {
                Ok(results) => result.assertions.extend(results),
                Err(e) => result.assertions.push(crate::result::AssertionResult {
                    field_path,
                    rule: "unknown".to_string(),
                    passed: false,
                    expected: Value::Null,
                    actual: Value::Null,
                    message: e.to_string(),
                }),
            }
        }

        result
    }
}

/// Run every capture in `specs` against `response_context`, writing into
/// scope. Returns `false` if any capture failed (caller decides whether to
/// keep going based on `continue_on_capture_failure`).
fn run_captures(
    specs: &IndexMap<String, CaptureSpec>,
    response_context: &Value,
    ctx: &mut StepContext<'_>,
    captured_this_step: &mut HashSet<String>,
    result: &mut StepResult,
) -> bool {
    let mut all_ok = true;
    for (name, spec) in specs {
        let extracted = capture::extract(name, spec, response_context, Some(ctx.evaluator), ctx.scopes);
        let outcome = match extracted {
            Ok(value) => {
                result.captured.insert(name.clone(), value.clone());
                capture::write(ctx.scopes, captured_this_step, name, value, spec)
            }
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            all_ok = false;
            result.status = Status::Failure;
            result.error_message = Some(e.to_string());
        }
    }
    all_ok
}

fn build_request(
    request: &testflow_core::suite::RequestSpec,
    interpolator: &Interpolator<'_>,
    ctx: &StepContext<'_>,
) -> Result<RequestSpecRuntime, testflow_vars::VarsError> {
    let method = display_value(interpolator.interpolate_str(&request.method, ctx.scopes, 0)?);
    let raw_url = display_value(interpolator.interpolate_str(&request.url, ctx.scopes, 0)?);
    let url = resolve_url(&raw_url, ctx.base_url.as_deref());

    let mut headers = BTreeMap::new();
    for (k, v) in &request.headers {
        headers.insert(k.clone(), display_value(interpolator.interpolate_str(v, ctx.scopes, 0)?));
    }

    let mut query = BTreeMap::new();
    for (k, v) in &request.query {
        query.insert(k.clone(), display_value(interpolator.interpolate_str(v, ctx.scopes, 0)?));
    }

    let body = match &request.body {
        Some(b) => Some(interpolator.interpolate_value(b, ctx.scopes)?),
        None => None,
    };

    let timeout = request
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(ctx.default_timeout);

    Ok(RequestSpecRuntime { method, url, headers, query, body, timeout })
}

fn resolve_url(url: &str, base_url: Option<&str>) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    match base_url {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/')),
        None => url.to_string(),
    }
}

fn display_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_url_prefers_absolute_urls() {
        assert_eq!(resolve_url("https://x.test/a", Some("https://base")), "https://x.test/a");
    }

    #[test]
    fn resolve_url_joins_relative_path_with_base() {
        assert_eq!(resolve_url("/users", Some("https://api.test/")), "https://api.test/users");
        assert_eq!(resolve_url("users", Some("https://api.test")), "https://api.test/users");
    }

    #[test]
    fn resolve_url_with_no_base_is_unchanged() {
        assert_eq!(resolve_url("/ping", None), "/ping");
    }

    #[test]
    fn display_value_unwraps_plain_strings() {
        assert_eq!(display_value(json!("x")), "x");
        assert_eq!(display_value(json!(5)), "5");
        assert_eq!(display_value(Value::Null), "");
    }
}
