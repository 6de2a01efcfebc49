//! Aggregator: folds every suite's result into one run-level summary.

use serde::{Deserialize, Serialize};

use testflow_exec::{Status, SuiteResult};

/// The final outcome of one run, across every suite the Scheduler touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    /// `successful / (total - skipped)`, or `0.0` if every suite was skipped.
    pub success_rate: f64,
    /// Whether the run ended early (`fail_fast_on_required` tripped, or the
    /// caller cancelled it) rather than running every reachable suite.
    pub cancelled: bool,
    pub suites: Vec<SuiteResult>,
}

impl AggregatedResult {
    pub fn from_suites(suites: Vec<SuiteResult>, cancelled: bool) -> Self {
        let total = suites.len();
        let successful = suites.iter().filter(|s| s.status == Status::Success).count();
        let failed = suites.iter().filter(|s| s.status == Status::Failure).count();
        let skipped = suites.iter().filter(|s| s.status == Status::Skipped).count();
        let denominator = total - skipped;
        let success_rate = if denominator > 0 {
            successful as f64 / denominator as f64
        } else {
            0.0
        };

        Self {
            total,
            successful,
            failed,
            skipped,
            success_rate,
            cancelled,
            suites,
        }
    }
}
