//! Suite discovery: finds suite files on disk, parses them, and builds the
//! dependency graph that drives execution order.

pub mod error;
pub mod graph;
pub mod walk;

use std::path::Path;

use testflow_core::config::DiscoveryConfig;
use testflow_core::suite::Suite;

pub use error::DiscoveryError;
pub use graph::{DependencyGraph, DiscoveredSuite};

/// Discover, parse, and graph every suite under `root`. This is the single
/// entry point the CLI and the scheduler both use.
pub fn load_all(root: &Path, config: &DiscoveryConfig) -> Result<LoadedSuites, DiscoveryError> {
    let files = walk::discover_suite_files(root, config)?;
    let mut suites = Vec::with_capacity(files.len());
    for path in files {
        let suite = Suite::from_file(&path)?;
        suites.push(DiscoveredSuite { suite, path });
    }
    let graph = DependencyGraph::build(&suites)?;
    Ok(LoadedSuites { suites, graph })
}

/// Every discovered suite plus its resolved dependency graph.
pub struct LoadedSuites {
    pub suites: Vec<DiscoveredSuite>,
    pub graph: DependencyGraph,
}

impl LoadedSuites {
    pub fn find(&self, node_id: &str) -> Option<&DiscoveredSuite> {
        self.suites.iter().find(|s| s.suite.node_id.as_str() == node_id)
    }
}
