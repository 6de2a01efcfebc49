//! testflow: declarative YAML-driven HTTP API test engine.
//!
//! Usage:
//!   testflow [OPTIONS] [SUITE_PATH]...
//!
//! Examples:
//!   testflow                                # run everything under the configured test directory
//!   testflow tests/checkout.suite.yaml      # run one suite file
//!   testflow --tag smoke --priority critical
//!   testflow --dry-run
//!   testflow --format json --output report.json

mod args;
mod config_search;
mod error;
mod events;
mod filters;
mod run;
mod stub;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run::run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {e}", "Error".red());
            ExitCode::from(1)
        }
    }
}
