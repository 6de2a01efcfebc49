use testflow_core::ident::NodeId;
use testflow_core::suite::SuiteParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to walk {0}: {1}")]
    Walk(String, walkdir::Error),

    #[error("invalid discovery glob pattern {0:?}: {1}")]
    Pattern(String, glob::PatternError),

    #[error(transparent)]
    SuiteParse(#[from] SuiteParseError),

    #[error("suite {0} is declared more than once (files: {1}, {2})")]
    DuplicateNodeId(NodeId, String, String),

    #[error("suite {from} depends on {reference:?}, which does not resolve to any discovered suite")]
    UnresolvedDependency { from: NodeId, reference: String },

    #[error("dependency cycle detected: {}", .0.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(" -> "))]
    Cycle(Vec<NodeId>),
}
