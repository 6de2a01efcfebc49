//! Suite Runner: executes a suite's steps in declared order, applies
//! `before_all`/`after_all` hooks, and resolves `call` steps into another
//! suite's run within the current scope chain.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use testflow_core::ident::NodeId;
use testflow_core::suite::{CallSpec, Step, Suite};
use testflow_http::{HttpClient, RetryPolicy};
use testflow_vars::{FakerProvider, ScopeLayer, Scopes, ScriptEvaluator};

use crate::error::ExecError;
use crate::result::{Status, StepResult, SuiteResult};
use crate::step::{StepContext, StepExecutor};

pub struct SuiteRunner<'a> {
    pub suites: &'a HashMap<NodeId, Suite>,
    pub faker: &'a FakerProvider,
    pub evaluator: &'a (dyn ScriptEvaluator + Send + Sync),
    pub http: &'a HttpClient,
    pub retry: RetryPolicy,
    pub default_timeout: Duration,
    pub strict_interpolation: bool,
    pub continue_on_capture_failure: bool,
    /// If true, a failed step marks every remaining step in the suite
    /// `Skipped` rather than running it.
    pub fail_fast: bool,
}

impl<'a> SuiteRunner<'a> {
    /// Run one suite to completion. `call_stack` carries the chain of
    /// in-progress `call`s so a recursive cycle can be detected.
    pub async fn run(&self, suite: &Suite, scopes: &mut Scopes, call_stack: &mut Vec<NodeId>) -> Result<SuiteResult, ExecError> {
        if call_stack.contains(&suite.node_id) {
            return Err(ExecError::CallCycle(describe_cycle(call_stack, &suite.node_id)));
        }
        call_stack.push(suite.node_id.clone());
        let start = Instant::now();

        for (name, value) in &suite.variables {
            scopes.set(ScopeLayer::Suite, name, value.clone());
        }

        let mut steps = Vec::new();
        if let Some(hooks) = &suite.hooks {
            for step in &hooks.before_all {
                steps.push(self.run_step(suite, step, scopes, call_stack).await?);
            }
        }

        let mut failed = false;
        for step in &suite.steps {
            if failed && self.fail_fast {
                steps.push(StepResult::skipped(step.name.clone(), "a prior step in this suite failed"));
                continue;
            }
            let result = self.run_step(suite, step, scopes, call_stack).await?;
            if result.status == Status::Failure {
                failed = true;
            }
            steps.push(result);
        }

        if let Some(hooks) = &suite.hooks {
            for step in &hooks.after_all {
                match self.run_step(suite, step, scopes, call_stack).await {
                    Ok(result) => steps.push(result),
                    Err(e) => {
                        let mut result = StepResult::new(step.name.clone());
                        result.status = Status::Failure;
                        result.error_message = Some(e.to_string());
                        steps.push(result);
                    }
                }
            }
        }

        call_stack.pop();

        let captured_promoted = scopes.layer_snapshot(ScopeLayer::Suite);
        let status = SuiteResult::compute_status(&steps);
        tracing::debug!(suite = %suite.node_id, status = ?status, steps = steps.len(), "suite finished");
        Ok(SuiteResult {
            node_id: suite.node_id.clone(),
            suite_name: suite.suite_name.clone(),
            status,
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            captured_promoted,
            error_message: None,
        })
    }

    async fn run_step(&self, suite: &Suite, step: &Step, scopes: &mut Scopes, call_stack: &mut Vec<NodeId>) -> Result<StepResult, ExecError> {
        if let Some(call) = &step.call {
            return self.run_call(&step.name, call, scopes, call_stack).await;
        }

        let mut ctx = StepContext {
            scopes,
            faker: self.faker,
            evaluator: self.evaluator,
            http: self.http,
            retry: self.retry,
            base_url: suite.base_url.clone(),
            strict_interpolation: self.strict_interpolation,
            continue_on_capture_failure: self.continue_on_capture_failure,
            default_timeout: self.default_timeout,
        };
        Ok(StepExecutor::execute(step, &mut ctx).await)
    }

    fn run_call<'b>(
        &'b self,
        step_name: &'b str,
        call: &'b CallSpec,
        scopes: &'b mut Scopes,
        call_stack: &'b mut Vec<NodeId>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<StepResult, ExecError>> + 'b>> {
        Box::pin(async move {
            let target_id = NodeId::from(call.node_id.clone());
            if call_stack.contains(&target_id) {
                return Err(ExecError::CallCycle(describe_cycle(call_stack, &target_id)));
            }
            let target = self
                .suites
                .get(&target_id)
                .ok_or_else(|| ExecError::CalledSuiteNotFound(target_id.to_string()))?;

            let mut child_scopes = scopes.child();
            for (name, value) in &call.inputs {
                child_scopes.set(ScopeLayer::Call, name, value.clone());
            }

            let suite_result = self.run(target, &mut child_scopes, call_stack).await?;

            for (name, value) in &suite_result.captured_promoted {
                scopes.set(ScopeLayer::Suite, name, value.clone());
            }

            let mut result = StepResult::new(step_name.to_string());
            result.status = suite_result.status;
            result.duration_ms = suite_result.duration_ms;
            result.error_message = suite_result.error_message.clone();
            result.iterations = suite_result.steps;
            Ok(result)
        })
    }
}

fn describe_cycle(call_stack: &[NodeId], target: &NodeId) -> String {
    let mut chain: Vec<String> = call_stack.iter().map(|id| id.as_str().to_string()).collect();
    chain.push(target.as_str().to_string());
    chain.join(" -> ")
}
