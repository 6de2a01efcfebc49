//! Lifecycle notifications the Scheduler emits as it dispatches suites.
//! Deliberately decoupled from any particular sink (JSONL, terminal, ...);
//! the caller supplies a callback and decides what to do with each event.

use std::sync::Arc;

use testflow_core::ident::NodeId;

use crate::aggregate::AggregatedResult;

#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    SuiteStart {
        node_id: NodeId,
    },
    SuiteEnd {
        node_id: NodeId,
        status: testflow_exec::Status,
        duration_ms: u64,
    },
    ExecutionEnd {
        summary: AggregatedResultSummary,
    },
}

/// The numbers from an `AggregatedResult`, without cloning every suite's
/// full step tree into the event.
#[derive(Debug, Clone, Copy)]
pub struct AggregatedResultSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub success_rate: f64,
}

impl From<&AggregatedResult> for AggregatedResultSummary {
    fn from(result: &AggregatedResult) -> Self {
        Self {
            total: result.total,
            successful: result.successful,
            failed: result.failed,
            skipped: result.skipped,
            success_rate: result.success_rate,
        }
    }
}

pub type EventCallback = Arc<dyn Fn(SchedulerEvent) + Send + Sync>;
