//! Result types produced by the Step Executor and Suite Runner.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use testflow_core::ident::NodeId;
use testflow_http::AttemptRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
    Skipped,
}

/// The outcome of one assertion rule evaluated against `{response, vars}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionResult {
    pub field_path: String,
    pub rule: String,
    pub passed: bool,
    pub expected: Value,
    pub actual: Value,
    pub message: String,
}

/// What one scenario contributed to a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioMeta {
    pub condition: String,
    pub matched: bool,
    pub executed: bool,
    pub branch_taken: Option<String>,
    pub assertions_contributed: usize,
    pub captures_contributed: usize,
}

/// The result of one step, or one iteration of a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_name: String,
    pub status: Status,
    pub duration_ms: u64,
    pub request: Option<Value>,
    pub response: Option<Value>,
    pub attempts: Vec<RecordedAttempt>,
    pub assertions: Vec<AssertionResult>,
    pub captured: HashMap<String, Value>,
    pub scenarios_meta: Vec<ScenarioMeta>,
    pub iterations: Vec<StepResult>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedAttempt {
    pub curl: String,
    pub status_code: Option<u16>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl From<AttemptRecord> for RecordedAttempt {
    fn from(a: AttemptRecord) -> Self {
        Self {
            curl: a.curl,
            status_code: a.status_code,
            duration_ms: a.duration_ms,
            error: a.error,
        }
    }
}

impl StepResult {
    pub fn new(step_name: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            status: Status::Success,
            duration_ms: 0,
            request: None,
            response: None,
            attempts: Vec::new(),
            assertions: Vec::new(),
            captured: HashMap::new(),
            scenarios_meta: Vec::new(),
            iterations: Vec::new(),
            error_message: None,
        }
    }

    pub fn skipped(step_name: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut result = Self::new(step_name);
        result.status = Status::Skipped;
        result.error_message = Some(reason.into());
        result
    }

    /// Recompute status from assertions plus any nested iteration results;
    /// an explicit failure (transport/script error) always wins.
    pub fn finalize_status(&mut self) {
        if self.status == Status::Skipped {
            return;
        }
        let assertions_ok = self.assertions.iter().all(|a| a.passed);
        let iterations_ok = self.iterations.iter().all(|r| r.status == Status::Success);
        self.status = if assertions_ok && iterations_ok && self.error_message.is_none() {
            Status::Success
        } else {
            Status::Failure
        };
    }
}

/// The result of one suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub node_id: NodeId,
    pub suite_name: String,
    pub status: Status,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub captured_promoted: HashMap<String, Value>,
    pub error_message: Option<String>,
}

impl SuiteResult {
    /// A suite the scheduler never started: a dependency failed, the run
    /// was cancelled, or the node-id didn't resolve to a loaded suite.
    pub fn skipped(node_id: NodeId, suite_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            node_id,
            suite_name: suite_name.into(),
            status: Status::Skipped,
            duration_ms: 0,
            steps: Vec::new(),
            captured_promoted: HashMap::new(),
            error_message: Some(reason.into()),
        }
    }

    /// A suite that could not be run to completion for a reason outside the
    /// Suite Runner's own step-by-step failure reporting (cancellation,
    /// a panic inside the runner's task).
    pub fn errored(node_id: NodeId, suite_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            node_id,
            suite_name: suite_name.into(),
            status: Status::Failure,
            duration_ms: 0,
            steps: Vec::new(),
            captured_promoted: HashMap::new(),
            error_message: Some(reason.into()),
        }
    }

    /// Success iff every non-skipped step succeeded.
    pub fn compute_status(steps: &[StepResult]) -> Status {
        let relevant: Vec<&StepResult> = steps.iter().filter(|s| s.status != Status::Skipped).collect();
        if relevant.iter().any(|s| s.status == Status::Failure) {
            Status::Failure
        } else {
            Status::Success
        }
    }
}
