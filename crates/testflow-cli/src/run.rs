//! Orchestration: Config Loader -> Discovery -> filtering -> Scheduler ->
//! Aggregator -> Reporter, wired together the way `main` needs it, minus
//! argument parsing and process exit handling (kept in `main.rs`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tokio_util::sync::CancellationToken;

use testflow_core::config::EngineConfig;
use testflow_core::ident::NodeId;
use testflow_core::suite::Suite;
use testflow_discovery::graph::{DependencyGraph, DiscoveredSuite};
use testflow_discovery::{walk, LoadedSuites};
use testflow_http::{HttpClient, RetryPolicy};
use testflow_report::{LiveEventSink, ReportFormat, Reporter};
use testflow_scheduler::{Scheduler, SchedulerConfig, SuiteEnvironment};
use testflow_vars::{FakerProvider, GlobalRegistry};

use crate::args::{Args, Command, Verbosity};
use crate::error::CliError;
use crate::events::{emit_discovered, emit_suite_steps, sink_callback};
use crate::filters::RunFilters;
use crate::{config_search, stub};

const SIGINT_CODE: u8 = 130;
const SIGTERM_CODE: u8 = 143;

pub async fn run(args: Args) -> Result<ExitCode, CliError> {
    if let Some(command) = &args.command {
        return run_command(command).map(|()| ExitCode::SUCCESS);
    }

    let search_root = args.directory.clone().unwrap_or_else(|| PathBuf::from("."));
    let config_path = config_search::resolve(args.config.as_deref(), &search_root);
    let config = match &config_path {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    let loaded = discover(&args, &config)?;
    let filters = RunFilters::build(&config.filters, &args.priority, &args.suite, &args.node, &args.tag)
        .map_err(CliError::Filter)?;
    let selected: Vec<&DiscoveredSuite> = loaded.suites.iter().filter(|s| filters.matches(s)).collect();

    if selected.is_empty() && !filters.is_empty() {
        eprintln!("{}: no suite matched the given filters", "Warning".yellow());
        return Ok(ExitCode::SUCCESS);
    }

    if args.dry_run {
        print_dry_run(&selected);
        return Ok(ExitCode::SUCCESS);
    }

    let verbosity = args.verbosity.resolve();
    let live_sink = match &args.live_events {
        Some(path) => Some(Arc::new(LiveEventSink::create(path)?)),
        None => None,
    };

    if let Some(sink) = &live_sink {
        for discovered in &selected {
            emit_discovered(sink, &discovered.suite.node_id, &discovered.suite.suite_name);
        }
    }

    let env = build_environment(&config, &selected)?;
    let scheduler = build_scheduler(&config, live_sink.clone());
    let graph = restrict_graph(&loaded.graph, &selected)?;
    let priorities: HashMap<NodeId, testflow_core::priority::Priority> =
        selected.iter().map(|d| (d.suite.node_id.clone(), d.suite.priority)).collect();

    let cancel = CancellationToken::new();
    let received_signal = Arc::new(AtomicU8::new(0));
    let signal_task = spawn_signal_listener(cancel.clone(), Arc::clone(&received_signal));

    let aggregated = scheduler.run(&graph, &priorities, env, cancel).await;
    signal_task.abort();

    if let Some(sink) = &live_sink {
        for suite_result in &aggregated.suites {
            emit_suite_steps(sink, suite_result);
        }
    }

    let reporter = reporter_for(verbosity);
    let report = reporter.generate(&aggregated);
    let format: ReportFormat = args.format.parse().map_err(CliError::Format)?;

    if verbosity != Verbosity::Silent {
        match &args.output {
            Some(path) => reporter.save(&report, format, path)?,
            None => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                reporter.write(&report, format, &mut handle)?;
            }
        }
    } else if let Some(path) = &args.output {
        reporter.save(&report, format, path)?;
    }

    if !args.no_log {
        persist_state(&config, &aggregated)?;
    }

    let signal = received_signal.load(Ordering::SeqCst);
    if signal == SIGINT_CODE || signal == SIGTERM_CODE {
        return Ok(ExitCode::from(signal));
    }

    if aggregated.total > 0 && (aggregated.success_rate - 1.0).abs() < f64::EPSILON {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

fn run_command(command: &Command) -> Result<(), CliError> {
    match command {
        Command::Init => stub::init(),
        Command::Dashboard { action } => stub::dashboard(*action),
        Command::ImportOpenapi { .. } => stub::import_openapi(),
        Command::ImportPostman { .. } => stub::import_postman(),
        Command::ExportPostman { .. } => stub::export_postman(),
    }
}

/// Discover suites either from the explicit `SUITE_PATH` arguments, or (if
/// none were given) from the configured test directory.
fn discover(args: &Args, config: &EngineConfig) -> Result<LoadedSuites, CliError> {
    if args.suites.is_empty() {
        let root = args.directory.clone().unwrap_or_else(|| PathBuf::from(&config.test_directory));
        return Ok(testflow_discovery::load_all(&root, &config.discovery)?);
    }

    let mut discovered = Vec::new();
    for path in &args.suites {
        collect_path(path, config, &mut discovered)?;
    }
    let graph = DependencyGraph::build(&discovered)?;
    Ok(LoadedSuites { suites: discovered, graph })
}

fn collect_path(path: &Path, config: &EngineConfig, out: &mut Vec<DiscoveredSuite>) -> Result<(), CliError> {
    if path.is_dir() {
        for file in walk::discover_suite_files(path, &config.discovery)? {
            out.push(DiscoveredSuite { suite: Suite::from_file(&file)?, path: file });
        }
    } else {
        out.push(DiscoveredSuite { suite: Suite::from_file(path)?, path: path.to_path_buf() });
    }
    Ok(())
}

/// Build a graph over only the filtered suite set, re-resolving edges among
/// that subset. A dependency outside the selection is dropped rather than
/// treated as unresolved — the CLI's filters narrow what runs, not what's
/// allowed to exist on disk.
fn restrict_graph(_full_graph: &DependencyGraph, selected: &[&DiscoveredSuite]) -> Result<DependencyGraph, CliError> {
    let selected_ids: std::collections::HashSet<&str> =
        selected.iter().map(|d| d.suite.node_id.as_str()).collect();

    let mut narrowed: Vec<DiscoveredSuite> = Vec::with_capacity(selected.len());
    for discovered in selected {
        let mut suite = discovered.suite.clone();
        suite.depends.retain(|dep| match dep {
            testflow_core::suite::DependencyRef::NodeId { node_id } => selected_ids.contains(node_id.as_str()),
            testflow_core::suite::DependencyRef::Path { .. } => false,
            testflow_core::suite::DependencyRef::Shorthand(reference) => selected_ids.contains(reference.as_str()),
        });
        narrowed.push(DiscoveredSuite { suite, path: discovered.path.clone() });
    }
    Ok(DependencyGraph::build(&narrowed)?)
}

fn build_environment(config: &EngineConfig, selected: &[&DiscoveredSuite]) -> Result<SuiteEnvironment, CliError> {
    let suites: HashMap<NodeId, Suite> =
        selected.iter().map(|d| (d.suite.node_id.clone(), d.suite.clone())).collect();

    let config_defaults: HashMap<String, serde_json::Value> = config
        .globals
        .variables
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let retry = RetryPolicy {
        enabled: config.execution.retry_failed.enabled,
        max_attempts: config.execution.retry_failed.max_attempts.max(1),
        delay: Duration::from_millis(config.execution.retry_failed.delay_ms),
    };

    Ok(SuiteEnvironment {
        suites,
        faker: FakerProvider::time_seeded(),
        evaluator: Arc::new(testflow_expr::Evaluator::new(config.globals.timeouts.script_ms)),
        http: HttpClient::new()?,
        global: GlobalRegistry::new(),
        config_defaults,
        retry,
        default_timeout: Duration::from_millis(config.globals.timeouts.request_ms),
        strict_interpolation: false,
        continue_on_capture_failure: true,
        step_fail_fast: false,
    })
}

fn build_scheduler(config: &EngineConfig, live_sink: Option<Arc<LiveEventSink>>) -> Scheduler {
    let required_priorities: std::collections::HashSet<testflow_core::priority::Priority> = config
        .priorities
        .required
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let scheduler_config = SchedulerConfig {
        mode: config.execution.mode,
        max_parallel: config.execution.max_parallel,
        continue_on_failure: config.execution.continue_on_failure,
        required_priorities,
        fail_fast_on_required: config.priorities.fail_fast_on_required,
    };

    let scheduler = Scheduler::new(scheduler_config);
    match live_sink {
        Some(sink) => scheduler.with_event_callback(sink_callback(sink)),
        None => scheduler,
    }
}

fn reporter_for(verbosity: Verbosity) -> Reporter {
    let max_output_length = match verbosity {
        Verbosity::Silent => 0,
        Verbosity::Simple => 80,
        Verbosity::Normal => 2000,
        Verbosity::Detailed => 8000,
        Verbosity::Verbose => usize::MAX,
    };
    Reporter::new().with_max_output_length(max_output_length)
}

fn print_dry_run(selected: &[&DiscoveredSuite]) {
    println!("{}", "Dry run - execution plan:".bold());
    println!();
    for discovered in selected {
        let suite = &discovered.suite;
        println!(
            "  {} ({}) [{}] - {} step(s)",
            suite.suite_name.green(),
            suite.node_id,
            suite.priority,
            suite.steps.len()
        );
        if !suite.depends.is_empty() {
            println!("    depends on: {}", suite.depends.len());
        }
    }
    println!();
    println!("{} suite(s) would run, no HTTP requests were made.", selected.len());
}

fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn persist_state(config: &EngineConfig, aggregated: &testflow_scheduler::AggregatedResult) -> Result<(), CliError> {
    let output_dir = PathBuf::from(&config.reporting.output_dir);
    std::fs::create_dir_all(&output_dir)?;

    let json = serde_json::to_string_pretty(aggregated).map_err(std::io::Error::other)?;
    std::fs::write(output_dir.join("latest.json"), &json)?;

    let slug = slugify(&config.project_name);
    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    std::fs::write(output_dir.join(format!("{slug}_{timestamp}.json")), &json)?;
    Ok(())
}

fn spawn_signal_listener(cancel: CancellationToken, received: Arc<AtomicU8>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => return,
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => received.store(SIGINT_CODE, Ordering::SeqCst),
                _ = sigterm.recv() => received.store(SIGTERM_CODE, Ordering::SeqCst),
            }
        }
        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_ok() {
                received.store(SIGINT_CODE, Ordering::SeqCst);
            }
        }
        cancel.cancel();
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_normalizes_punctuation_and_case() {
        assert_eq!(slugify("Checkout API"), "checkout-api");
        assert_eq!(slugify("my_project-v2"), "my-project-v2");
    }

    #[test]
    fn restrict_graph_drops_edges_to_suites_outside_the_selection() {
        let yaml_a = "node_id: a\nsteps: []\n";
        let yaml_b = "node_id: b\ndepends:\n  - node_id: a\nsteps: []\n";
        let a = DiscoveredSuite { suite: Suite::from_yaml(yaml_a, "inline").unwrap(), path: PathBuf::from("a") };
        let b = DiscoveredSuite { suite: Suite::from_yaml(yaml_b, "inline").unwrap(), path: PathBuf::from("b") };
        let full_graph = DependencyGraph::build(&[a.clone(), b.clone()]).unwrap();

        let narrowed = restrict_graph(&full_graph, &[&b]).unwrap();
        assert!(narrowed.dependencies_of(&NodeId::new("b")).is_empty());
    }
}
