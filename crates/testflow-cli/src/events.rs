//! Bridges `testflow_scheduler::SchedulerEvent` onto the JSONL live-event
//! stream. The Scheduler only knows about suite-level transitions; step
//! events are synthesized from a completed `SuiteResult`'s step list, since
//! the Step Executor doesn't carry its own event channel.

use std::sync::Arc;

use testflow_core::ident::NodeId;
use testflow_exec::{StepResult, SuiteResult};
use testflow_report::{LiveEvent, LiveEventSink};
use testflow_scheduler::SchedulerEvent;

fn status_str(status: testflow_exec::Status) -> String {
    match status {
        testflow_exec::Status::Success => "success",
        testflow_exec::Status::Failure => "failure",
        testflow_exec::Status::Skipped => "skipped",
    }
    .to_string()
}

/// Emit `test-discovered` for every suite the run will attempt, before any
/// of them start.
pub fn emit_discovered(sink: &LiveEventSink, node_id: &NodeId, suite_name: &str) {
    sink.emit(&LiveEvent::TestDiscovered {
        node_id: node_id.as_str().to_string(),
        suite_name: suite_name.to_string(),
    });
}

/// Build the callback the Scheduler invokes on every `SchedulerEvent`. Holds
/// its own `Arc<LiveEventSink>` so it can be cloned cheaply into the
/// `with_event_callback` closure.
pub fn sink_callback(sink: Arc<LiveEventSink>) -> testflow_scheduler::EventCallback {
    Arc::new(move |event: SchedulerEvent| match event {
        SchedulerEvent::SuiteStart { node_id } => {
            sink.emit(&LiveEvent::SuiteStart { node_id: node_id.as_str().to_string() });
        }
        SchedulerEvent::SuiteEnd { node_id, status, duration_ms } => {
            sink.emit(&LiveEvent::SuiteEnd {
                node_id: node_id.as_str().to_string(),
                status: status_str(status),
                duration_ms,
            });
        }
        SchedulerEvent::ExecutionEnd { summary } => {
            sink.emit(&LiveEvent::ExecutionEnd {
                total: summary.total,
                successful: summary.successful,
                failed: summary.failed,
                skipped: summary.skipped,
                success_rate: summary.success_rate,
            });
        }
    })
}

/// After a suite finishes, synthesize the `step-start`/`step-end` pairs its
/// run implied, in declaration order. Nested iterations are flattened under
/// their parent step's name rather than given their own node.
pub fn emit_suite_steps(sink: &LiveEventSink, result: &SuiteResult) {
    for step in &result.steps {
        emit_step(sink, result.node_id.as_str(), step);
    }
}

fn emit_step(sink: &LiveEventSink, node_id: &str, step: &StepResult) {
    sink.emit(&LiveEvent::StepStart { node_id: node_id.to_string(), step_name: step.step_name.clone() });
    sink.emit(&LiveEvent::StepEnd {
        node_id: node_id.to_string(),
        step_name: step.step_name.clone(),
        status: status_str(step.status),
        duration_ms: step.duration_ms,
    });
    for iteration in &step.iterations {
        emit_step(sink, node_id, iteration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use testflow_core::ident::NodeId;

    fn step(name: &str, status: testflow_exec::Status) -> StepResult {
        let mut s = StepResult::new(name);
        s.status = status;
        s
    }

    #[test]
    fn emit_suite_steps_covers_nested_iterations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let sink = LiveEventSink::create(&path).unwrap();

        let mut outer = step("fetch", testflow_exec::Status::Success);
        outer.iterations.push(step("fetch[0]", testflow_exec::Status::Success));
        outer.iterations.push(step("fetch[1]", testflow_exec::Status::Failure));

        let result = SuiteResult {
            node_id: NodeId::new("suite-a"),
            suite_name: "Suite A".to_string(),
            status: testflow_exec::Status::Failure,
            duration_ms: 42,
            steps: vec![outer],
            captured_promoted: HashMap::new(),
            error_message: None,
        };

        emit_suite_steps(&sink, &result);
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].contains("step-start"));
        assert!(lines.iter().any(|l| l.contains("fetch[1]") && l.contains("failure")));
    }
}
