//! Scheduler configuration: how wide the worker pool is and what a failure
//! does to the rest of the run.

use std::collections::HashSet;

use testflow_core::priority::{ExecutionMode, Priority};

/// Tunables the Scheduler needs, independent of any one suite. Usually built
/// from a loaded `EngineConfig`'s `execution`/`priorities` sections.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub mode: ExecutionMode,
    pub max_parallel: usize,
    /// If a suite fails, should its dependents still be skipped, or should
    /// the run barrel ahead and let them run anyway?
    pub continue_on_failure: bool,
    /// A failure in one of these priority tiers cancels every suite that
    /// hasn't started yet, instead of only skipping its dependents.
    pub required_priorities: HashSet<Priority>,
    pub fail_fast_on_required: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Parallel,
            max_parallel: 8,
            continue_on_failure: true,
            required_priorities: HashSet::from([Priority::Critical]),
            fail_fast_on_required: true,
        }
    }
}

impl SchedulerConfig {
    /// The number of suites allowed to run at once. Sequential mode is a
    /// worker pool of exactly one, not a different code path.
    pub fn effective_parallelism(&self) -> usize {
        match self.mode {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Parallel => self.max_parallel.max(1),
        }
    }

    pub fn is_required(&self, priority: Priority) -> bool {
        self.required_priorities.contains(&priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_mode_ignores_max_parallel() {
        let config = SchedulerConfig {
            mode: ExecutionMode::Sequential,
            max_parallel: 16,
            ..SchedulerConfig::default()
        };
        assert_eq!(config.effective_parallelism(), 1);
    }

    #[test]
    fn parallel_mode_floors_at_one() {
        let config = SchedulerConfig {
            mode: ExecutionMode::Parallel,
            max_parallel: 0,
            ..SchedulerConfig::default()
        };
        assert_eq!(config.effective_parallelism(), 1);
    }

    #[test]
    fn required_priority_lookup() {
        let config = SchedulerConfig::default();
        assert!(config.is_required(Priority::Critical));
        assert!(!config.is_required(Priority::Low));
    }
}
