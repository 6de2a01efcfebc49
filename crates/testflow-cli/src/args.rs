//! Command-line surface: flags, filters, and the small set of delegated
//! subcommands that don't touch the core run pipeline.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Declarative YAML-driven HTTP API test engine.
#[derive(Parser, Debug)]
#[command(name = "testflow")]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Suite files or directories to run. Defaults to the configured test directory.
    #[arg(value_name = "SUITE_PATH")]
    pub suites: Vec<PathBuf>,

    /// Config file path. Overrides the default search order.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Override the configured test directory.
    #[arg(short = 'd', long = "directory")]
    pub directory: Option<PathBuf>,

    /// Select an environment profile.
    #[arg(short = 'e', long = "environment")]
    pub environment: Option<String>,

    #[command(flatten)]
    pub verbosity: VerbosityArgs,

    /// Only run suites at these priority levels (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub priority: Vec<String>,

    /// Only run these suites, by node_id (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub suite: Vec<String>,

    /// Only run these nodes, by node_id (comma-separated). Alias for --suite.
    #[arg(long, value_delimiter = ',')]
    pub node: Vec<String>,

    /// Only run suites carrying one of these tags (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub tag: Vec<String>,

    /// Print the execution plan and exit without performing any HTTP I/O.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip writing results/latest.json and the per-run archive.
    #[arg(long)]
    pub no_log: bool,

    /// Append a JSONL line per lifecycle event to the given path
    /// (default: results/live-events.jsonl).
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "results/live-events.jsonl")]
    pub live_events: Option<PathBuf>,

    /// Output format: terminal, json, html, junit.
    #[arg(short, long, default_value = "terminal")]
    pub format: String,

    /// Output file. Defaults to stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Verbosity level for terminal reporting. Mutually exclusive: clap rejects
/// combinations of these at parse time via the shared `verbosity` group.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct VerbosityArgs {
    /// Show full request/response bodies for every step.
    #[arg(long, group = "verbosity")]
    pub verbose: bool,

    /// Show assertion-level detail without full bodies.
    #[arg(long, group = "verbosity")]
    pub detailed: bool,

    /// One line per suite, no step detail.
    #[arg(long, group = "verbosity")]
    pub simple: bool,

    /// Suppress terminal output entirely; still writes --output / --live-events.
    #[arg(long, group = "verbosity")]
    pub silent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Silent,
    Simple,
    Normal,
    Detailed,
    Verbose,
}

impl VerbosityArgs {
    pub fn resolve(&self) -> Verbosity {
        if self.silent {
            Verbosity::Silent
        } else if self.simple {
            Verbosity::Simple
        } else if self.detailed {
            Verbosity::Detailed
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive config scaffold. Delegated to an external collaborator.
    Init,
    /// Manage the companion dashboard UI. Delegated to an external collaborator.
    Dashboard {
        #[arg(value_enum)]
        action: DashboardAction,
    },
    /// Generate suite files from an OpenAPI document.
    ImportOpenapi { path: PathBuf },
    /// Read Postman collections into suite files.
    ImportPostman { path: PathBuf },
    /// Write suites out as a Postman collection.
    ExportPostman {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DashboardAction {
    Install,
    Dev,
    Build,
    Preview,
    Serve,
}

impl std::fmt::Display for DashboardAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DashboardAction::Install => "install",
            DashboardAction::Dev => "dev",
            DashboardAction::Build => "build",
            DashboardAction::Preview => "preview",
            DashboardAction::Serve => "serve",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_defaults_to_normal() {
        let args = VerbosityArgs::default();
        assert_eq!(args.resolve(), Verbosity::Normal);
    }

    #[test]
    fn verbosity_prefers_most_specific_flag_set() {
        let args = VerbosityArgs { silent: true, ..Default::default() };
        assert_eq!(args.resolve(), Verbosity::Silent);
    }

    #[test]
    fn parses_comma_separated_filters() {
        let args = Args::parse_from(["testflow", "--tag", "smoke,regression"]);
        assert_eq!(args.tag, vec!["smoke", "regression"]);
    }

    #[test]
    fn parses_live_events_with_default_path() {
        let args = Args::parse_from(["testflow", "--live-events"]);
        assert_eq!(args.live_events, Some(PathBuf::from("results/live-events.jsonl")));
    }

    #[test]
    fn parses_live_events_with_explicit_path() {
        let args = Args::parse_from(["testflow", "--live-events", "out/events.jsonl"]);
        assert_eq!(args.live_events, Some(PathBuf::from("out/events.jsonl")));
    }

    #[test]
    fn mutually_exclusive_verbosity_flags_are_rejected() {
        let result = Args::try_parse_from(["testflow", "--verbose", "--silent"]);
        assert!(result.is_err());
    }

    #[test]
    fn dashboard_subcommand_parses_action() {
        let args = Args::parse_from(["testflow", "dashboard", "serve"]);
        assert!(matches!(args.command, Some(Command::Dashboard { action: DashboardAction::Serve })));
    }
}
