//! Scheduler: dispatches suites onto a bounded worker pool in an order that
//! respects the dependency graph and priority tiers, propagates a failed
//! suite's status to its dependents, and hands every `SuiteResult` to the
//! Aggregator.

pub mod aggregate;
pub mod config;
pub mod events;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use testflow_core::ident::NodeId;
use testflow_core::priority::Priority;
use testflow_core::suite::Suite;
use testflow_discovery::graph::DependencyGraph;
use testflow_exec::{Status, SuiteResult, SuiteRunner};
use testflow_http::{HttpClient, RetryPolicy};
use testflow_vars::{FakerProvider, GlobalRegistry, ScopeLayer, Scopes, ScriptEvaluator};

pub use aggregate::AggregatedResult;
pub use config::SchedulerConfig;
pub use events::{AggregatedResultSummary, EventCallback, SchedulerEvent};

/// Everything a spawned suite run needs, shared read-only across the whole
/// pool. Built once per run and cloned (cheaply, via `Arc`) into each task.
pub struct SuiteEnvironment {
    pub suites: HashMap<NodeId, Suite>,
    pub faker: FakerProvider,
    pub evaluator: Arc<dyn ScriptEvaluator + Send + Sync>,
    pub http: HttpClient,
    pub global: Arc<GlobalRegistry>,
    pub config_defaults: HashMap<String, serde_json::Value>,
    pub retry: RetryPolicy,
    pub default_timeout: Duration,
    pub strict_interpolation: bool,
    pub continue_on_capture_failure: bool,
    pub step_fail_fast: bool,
}

/// The Scheduler itself; stateless between runs, so one instance can be
/// reused across repeated invocations (e.g. `--watch`, if ever added).
pub struct Scheduler {
    config: SchedulerConfig,
    on_event: Option<EventCallback>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config, on_event: None }
    }

    /// Subscribe to suite-level lifecycle events (suite-start, suite-end,
    /// execution-end). No-op until set; the CLI wires this to the
    /// `--live-events` JSONL sink.
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    fn notify(&self, event: SchedulerEvent) {
        if let Some(callback) = &self.on_event {
            callback(event);
        }
    }

    /// Run every suite in `graph` to completion (or to skip/cancel), honoring
    /// dependency order and priority tiers. `priorities` must have an entry
    /// for every node in `graph`; a missing one falls back to `Priority::Medium`.
    pub async fn run(
        &self,
        graph: &DependencyGraph,
        priorities: &HashMap<NodeId, Priority>,
        env: SuiteEnvironment,
        cancel: CancellationToken,
    ) -> AggregatedResult {
        let env = Arc::new(env);
        let node_ids = graph.node_ids();

        let mut in_degree: HashMap<NodeId, usize> = node_ids
            .iter()
            .map(|id| (id.clone(), graph.dependencies_of(id).len()))
            .collect();
        let mut ready: Vec<NodeId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| id.clone())
            .collect();

        // Suites whose ancestry has already failed: dispatched as `Skipped`
        // rather than run, the moment they would otherwise become ready.
        let mut doomed: HashSet<NodeId> = HashSet::new();
        let mut results: Vec<SuiteResult> = Vec::new();
        let mut fail_fast_triggered = false;
        let mut in_flight = 0usize;

        let permits = self.config.effective_parallelism();
        let semaphore = Arc::new(Semaphore::new(permits));
        let mut join_set: JoinSet<SuiteResult> = JoinSet::new();

        loop {
            while let Some(node_id) = pick_next(&mut ready, priorities) {
                if doomed.contains(&node_id) {
                    let name = suite_name(&env, &node_id);
                    propagate_doom(graph, &node_id, &mut doomed);
                    advance_ready(graph, &node_id, &mut in_degree, &mut ready);
                    let result = SuiteResult::skipped(node_id.clone(), name, "a dependency failed");
                    self.notify(SchedulerEvent::SuiteEnd { node_id, status: result.status, duration_ms: 0 });
                    results.push(result);
                    continue;
                }
                if cancel.is_cancelled() {
                    let name = suite_name(&env, &node_id);
                    advance_ready(graph, &node_id, &mut in_degree, &mut ready);
                    let result = SuiteResult::skipped(node_id.clone(), name, "run was cancelled");
                    self.notify(SchedulerEvent::SuiteEnd { node_id, status: result.status, duration_ms: 0 });
                    results.push(result);
                    continue;
                }

                let permit = match Arc::clone(&semaphore).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => continue,
                };
                self.notify(SchedulerEvent::SuiteStart { node_id: node_id.clone() });
                let env = Arc::clone(&env);
                let cancel_for_task = cancel.clone();
                in_flight += 1;
                join_set.spawn(async move {
                    let _permit = permit;
                    run_one_suite(node_id, env, cancel_for_task).await
                });
            }

            if in_flight == 0 {
                break;
            }

            let Some(joined) = join_set.join_next().await else {
                break;
            };
            in_flight -= 1;

            let result = match joined {
                Ok(result) => result,
                Err(join_error) => {
                    tracing::error!(error = %join_error, "suite task panicked");
                    continue;
                }
            };

            let node_id = result.node_id.clone();
            let priority = priorities.get(&node_id).copied().unwrap_or_default();
            let failed = result.status == Status::Failure;

            self.notify(SchedulerEvent::SuiteEnd {
                node_id: node_id.clone(),
                status: result.status,
                duration_ms: result.duration_ms,
            });
            advance_ready(graph, &node_id, &mut in_degree, &mut ready);

            if failed {
                tracing::warn!(suite = %node_id, "suite failed");
                if !self.config.continue_on_failure {
                    propagate_doom(graph, &node_id, &mut doomed);
                }
                if self.config.fail_fast_on_required && self.config.is_required(priority) {
                    fail_fast_triggered = true;
                    cancel.cancel();
                }
            }

            results.push(result);
        }

        let aggregated = AggregatedResult::from_suites(results, fail_fast_triggered || cancel.is_cancelled());
        self.notify(SchedulerEvent::ExecutionEnd {
            summary: AggregatedResultSummary::from(&aggregated),
        });
        aggregated
    }
}

fn suite_name(env: &SuiteEnvironment, node_id: &NodeId) -> String {
    env.suites
        .get(node_id)
        .map(|s| s.suite_name.clone())
        .unwrap_or_else(|| node_id.as_str().to_string())
}

/// Every node reaches a terminal result exactly once, whether it ran, was
/// skipped as doomed, or was skipped as cancelled — so its dependents'
/// in-degree is decremented here regardless of which of those three happened.
fn advance_ready(graph: &DependencyGraph, node_id: &NodeId, in_degree: &mut HashMap<NodeId, usize>, ready: &mut Vec<NodeId>) {
    for dependent in graph.dependents_of(node_id) {
        if let Some(degree) = in_degree.get_mut(&dependent) {
            if *degree > 0 {
                *degree -= 1;
            }
            if *degree == 0 {
                ready.push(dependent);
            }
        }
    }
}

/// Mark every transitive dependent of `start` as doomed, so it's reported
/// `Skipped` the moment it's popped from the ready set instead of being run.
fn propagate_doom(graph: &DependencyGraph, start: &NodeId, doomed: &mut HashSet<NodeId>) {
    let mut stack = graph.dependents_of(start);
    while let Some(node) = stack.pop() {
        if doomed.insert(node.clone()) {
            stack.extend(graph.dependents_of(&node));
        }
    }
}

/// Pop the highest-priority, then lowest-node-id, entry from the ready set.
/// Ready sets are small (one scheduling round's worth of newly-unblocked
/// suites), so a linear scan beats the bookkeeping of a heap.
fn pick_next(ready: &mut Vec<NodeId>, priorities: &HashMap<NodeId, Priority>) -> Option<NodeId> {
    let idx = ready
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| (priorities.get(*id).copied().unwrap_or_default(), (*id).clone()))
        .map(|(idx, _)| idx)?;
    Some(ready.remove(idx))
}

async fn run_one_suite(node_id: NodeId, env: Arc<SuiteEnvironment>, cancel: CancellationToken) -> SuiteResult {
    let suite = match env.suites.get(&node_id) {
        Some(suite) => suite,
        None => return SuiteResult::errored(node_id.clone(), node_id.as_str(), "suite not found in the loaded set"),
    };

    let mut scopes = Scopes::new(Arc::clone(&env.global));
    scopes.seed_environment();
    scopes.set_config_defaults(env.config_defaults.clone());

    let runner = SuiteRunner {
        suites: &env.suites,
        faker: &env.faker,
        evaluator: env.evaluator.as_ref(),
        http: &env.http,
        retry: env.retry,
        default_timeout: env.default_timeout,
        strict_interpolation: env.strict_interpolation,
        continue_on_capture_failure: env.continue_on_capture_failure,
        fail_fast: env.step_fail_fast,
    };

    let mut call_stack = Vec::new();
    let run_future = runner.run(suite, &mut scopes, &mut call_stack);
    tokio::pin!(run_future);

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            SuiteResult::skipped(suite.node_id.clone(), suite.suite_name.clone(), "run was cancelled")
        }
        result = &mut run_future => {
            match result {
                Ok(result) => result,
                Err(e) => SuiteResult::errored(suite.node_id.clone(), suite.suite_name.clone(), e.to_string()),
            }
        }
    }
}
