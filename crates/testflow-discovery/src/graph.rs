//! Dependency graph resolution: turns a suite's `depends` list into graph
//! edges, detects cycles, and produces a priority-tiered topological order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::path::{Path, PathBuf};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use testflow_core::ident::NodeId;
use testflow_core::priority::Priority;
use testflow_core::suite::{DependencyRef, Suite};

use crate::error::DiscoveryError;

/// A suite paired with the file it was loaded from, needed to resolve
/// path-form dependency references relative to it.
#[derive(Debug, Clone)]
pub struct DiscoveredSuite {
    pub suite: Suite,
    pub path: PathBuf,
}

/// The suite dependency DAG: an edge `a -> b` means `a` must run before `b`.
pub struct DependencyGraph {
    graph: DiGraph<NodeId, ()>,
    index: HashMap<NodeId, NodeIndex>,
}

impl DependencyGraph {
    pub fn build(suites: &[DiscoveredSuite]) -> Result<Self, DiscoveryError> {
        let mut graph = DiGraph::new();
        let mut index: HashMap<NodeId, NodeIndex> = HashMap::new();

        for discovered in suites {
            let node_id = discovered.suite.node_id.clone();
            if let Some(&existing) = index.get(&node_id) {
                let existing_path = suites
                    .iter()
                    .find(|s| index.get(&s.suite.node_id) == Some(&existing))
                    .map(|s| s.path.display().to_string())
                    .unwrap_or_default();
                return Err(DiscoveryError::DuplicateNodeId(
                    node_id,
                    existing_path,
                    discovered.path.display().to_string(),
                ));
            }
            let idx = graph.add_node(node_id.clone());
            index.insert(node_id, idx);
        }

        for discovered in suites {
            for dep in &discovered.suite.depends {
                let target = resolve(dep, discovered, suites)?;
                let from_idx = index[&target];
                let to_idx = index[&discovered.suite.node_id];
                graph.add_edge(from_idx, to_idx, ());
            }
        }

        Ok(Self { graph, index })
    }

    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Returns the node-ids of one cycle, if any exists.
    pub fn find_cycle(&self) -> Option<Vec<NodeId>> {
        for component in petgraph::algo::kosaraju_scc(&self.graph) {
            let is_cycle = component.len() > 1
                || (component.len() == 1 && self.graph.contains_edge(component[0], component[0]));
            if is_cycle {
                return Some(component.iter().map(|idx| self.graph[*idx].clone()).collect());
            }
        }
        None
    }

    /// Every node in the graph, in no particular order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.graph.node_indices().map(|idx| self.graph[idx].clone()).collect()
    }

    /// The suites `node` directly depends on (must finish before `node`).
    pub fn dependencies_of(&self, node: &NodeId) -> Vec<NodeId> {
        let idx = self.index[node];
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| self.graph[e.source()].clone())
            .collect()
    }

    /// The suites that directly depend on `node`.
    pub fn dependents_of(&self, node: &NodeId) -> Vec<NodeId> {
        let idx = self.index[node];
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| self.graph[e.target()].clone())
            .collect()
    }

    /// A topological order of the whole graph, breaking ties among suites
    /// with no unresolved dependency by priority (critical first) and then
    /// by node-id. `priority_of` looks up each suite's priority by node-id.
    pub fn execution_order(
        &self,
        priority_of: impl Fn(&NodeId) -> Priority,
    ) -> Result<Vec<NodeId>, DiscoveryError> {
        let mut in_degree: HashMap<NodeIndex, usize> = HashMap::new();
        for idx in self.graph.node_indices() {
            in_degree.insert(idx, self.graph.edges_directed(idx, Direction::Incoming).count());
        }

        let mut heap: BinaryHeap<Reverse<Candidate>> = BinaryHeap::new();
        for (&idx, deg) in &in_degree {
            if *deg == 0 {
                let node_id = self.graph[idx].clone();
                heap.push(Reverse(Candidate {
                    priority: priority_of(&node_id),
                    node_id,
                }));
            }
        }

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(candidate)) = heap.pop() {
            let idx = self.index[&candidate.node_id];
            order.push(candidate.node_id);

            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                let target = edge.target();
                let deg = in_degree.get_mut(&target).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    let node_id = self.graph[target].clone();
                    heap.push(Reverse(Candidate {
                        priority: priority_of(&node_id),
                        node_id,
                    }));
                }
            }
        }

        if order.len() != self.graph.node_count() {
            return Err(DiscoveryError::Cycle(self.find_cycle().unwrap_or_default()));
        }
        Ok(order)
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Candidate {
    priority: Priority,
    node_id: NodeId,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.priority, &self.node_id).cmp(&(&other.priority, &other.node_id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

fn resolve(
    dep: &DependencyRef,
    from: &DiscoveredSuite,
    suites: &[DiscoveredSuite],
) -> Result<NodeId, DiscoveryError> {
    let unresolved = |reference: String| DiscoveryError::UnresolvedDependency {
        from: from.suite.node_id.clone(),
        reference,
    };

    match dep {
        DependencyRef::NodeId { node_id } => suites
            .iter()
            .find(|s| s.suite.node_id.as_str() == node_id)
            .map(|s| s.suite.node_id.clone())
            .ok_or_else(|| unresolved(node_id.clone())),
        DependencyRef::Path { path } => {
            resolve_by_path(path, from, suites).ok_or_else(|| unresolved(path.clone()))
        }
        DependencyRef::Shorthand(reference) => suites
            .iter()
            .find(|s| s.suite.node_id.as_str() == reference)
            .map(|s| s.suite.node_id.clone())
            .or_else(|| resolve_by_path(reference, from, suites))
            .ok_or_else(|| unresolved(reference.clone())),
    }
}

fn resolve_by_path(rel: &str, from: &DiscoveredSuite, suites: &[DiscoveredSuite]) -> Option<NodeId> {
    let base = from.path.parent().unwrap_or_else(|| Path::new("."));
    let joined = base.join(rel);
    let joined_canon = std::fs::canonicalize(&joined).unwrap_or(joined);
    suites
        .iter()
        .find(|s| {
            let candidate = std::fs::canonicalize(&s.path).unwrap_or_else(|_| s.path.clone());
            candidate == joined_canon
        })
        .map(|s| s.suite.node_id.clone())
}
