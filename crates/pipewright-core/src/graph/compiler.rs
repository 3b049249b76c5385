//! Workflow graph compiler and runner.
//!
//! Builds a `petgraph` digraph from a [`WorkflowSpec`]: one vertex per
//! declared node (instantiated through the [`NodeRegistry`]), one edge per
//! declared edge. Running the compiled graph passes a single state mapping
//! from the start node along outgoing edges.
//!
//! Execution proceeds in supersteps. Each superstep runs the current
//! frontier in order; the next frontier is the successors of those nodes,
//! in edge declaration order, without repeats. Nodes with no outgoing edges
//! end their branch. Cycles are not rejected: a run that does not terminate
//! within `recursion_limit` supersteps fails with
//! [`GraphError::RecursionLimit`].

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use pipewright_types::workflow::WorkflowSpec;

use crate::registry::{NodeRegistry, StrategyError, StrategyRegistry, WorkflowNode, WorkflowState};

/// Default number of supersteps before a run is aborted.
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("node '{node}': {source}")]
    Node {
        node: String,
        #[source]
        source: StrategyError,
    },

    #[error("recursion limit of {0} steps reached without the workflow finishing")]
    RecursionLimit(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// CompiledWorkflow
// ---------------------------------------------------------------------------

struct GraphNode {
    id: String,
    node_type: String,
    node: Box<dyn WorkflowNode>,
}

/// An executable workflow. Holds no state between invocations.
pub struct CompiledWorkflow {
    graph: DiGraph<GraphNode, ()>,
    start: NodeIndex,
    recursion_limit: usize,
}

impl std::fmt::Debug for CompiledWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledWorkflow")
            .field("nodes", &self.node_ids())
            .field("start", &self.graph[self.start].id)
            .field("recursion_limit", &self.recursion_limit)
            .finish()
    }
}

impl CompiledWorkflow {
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    pub fn start(&self) -> &str {
        &self.graph[self.start].id
    }

    /// Node IDs in declaration order.
    pub fn node_ids(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .map(|i| self.graph[i].id.as_str())
            .collect()
    }

    /// Successor indices of `node` in edge declaration order.
    ///
    /// petgraph walks a node's outgoing edges newest first, so sort by edge
    /// index to recover the declared order.
    fn successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self.graph.edges(node).collect();
        edges.sort_by_key(|e| e.id());
        edges.into_iter().map(|e| e.target()).collect()
    }

    /// IDs of the nodes `id` hands its state to, in declaration order.
    pub fn successor_ids(&self, id: &str) -> Vec<&str> {
        self.graph
            .node_indices()
            .find(|&i| self.graph[i].id == id)
            .map(|i| {
                self.successors(i)
                    .into_iter()
                    .map(|s| self.graph[s].id.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Run the workflow from its start node and return the final state.
    pub fn invoke(&self, mut state: WorkflowState) -> Result<WorkflowState, GraphError> {
        let mut frontier = vec![self.start];
        let mut steps = 0usize;

        while !frontier.is_empty() {
            if steps >= self.recursion_limit {
                tracing::warn!(limit = self.recursion_limit, "workflow hit recursion limit");
                return Err(GraphError::RecursionLimit(self.recursion_limit));
            }
            steps += 1;

            let mut next = Vec::new();
            for &index in &frontier {
                let entry = &self.graph[index];
                let span = tracing::info_span!(
                    "workflow_node",
                    node_id = entry.id.as_str(),
                    node_type = entry.node_type.as_str(),
                    step = steps
                );
                let _enter = span.enter();

                state = entry.node.call(state).map_err(|source| GraphError::Node {
                    node: entry.id.clone(),
                    source,
                })?;
                tracing::debug!(node_id = entry.id.as_str(), "node completed");

                for successor in self.successors(index) {
                    if !next.contains(&successor) {
                        next.push(successor);
                    }
                }
            }
            frontier = next;
        }

        tracing::info!(steps, "workflow completed");
        Ok(state)
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Instantiate every node and wire the declared edges.
///
/// Checks, in order: at least one node is declared, each node type is
/// registered and its ID is unique, each node constructs (a node naming an
/// unregistered strategy is a configuration error), every edge endpoint is
/// declared, the start node is declared.
pub fn compile_workflow(
    spec: &WorkflowSpec,
    nodes: &NodeRegistry,
    strategies: &StrategyRegistry,
) -> Result<CompiledWorkflow, GraphError> {
    if spec.nodes.is_empty() {
        return Err(GraphError::Configuration(
            "workflow must declare at least one node".to_string(),
        ));
    }

    let mut graph = DiGraph::<GraphNode, ()>::new();
    let mut index_of: HashMap<&str, NodeIndex> = HashMap::new();

    for decl in &spec.nodes {
        let constructor = nodes.get(&decl.node_type).ok_or_else(|| {
            GraphError::Configuration(format!(
                "unknown node type '{}' for node '{}'",
                decl.node_type, decl.id
            ))
        })?;
        if index_of.contains_key(decl.id.as_str()) {
            return Err(GraphError::Configuration(format!(
                "duplicate node id '{}'",
                decl.id
            )));
        }

        let node = constructor(strategies, decl.params.clone()).map_err(|source| match source {
            StrategyError::Unresolved(e) => GraphError::Configuration(format!(
                "node '{}' ({}): {e}",
                decl.id, decl.node_type
            )),
            source => GraphError::Node {
                node: decl.id.clone(),
                source,
            },
        })?;
        let index = graph.add_node(GraphNode {
            id: decl.id.clone(),
            node_type: decl.node_type.clone(),
            node,
        });
        index_of.insert(decl.id.as_str(), index);
    }

    for edge in &spec.edges {
        let (Some(&from), Some(&to)) = (
            index_of.get(edge.source.as_str()),
            index_of.get(edge.target.as_str()),
        ) else {
            return Err(GraphError::Configuration(format!(
                "invalid edge {} -> {}",
                edge.source, edge.target
            )));
        };
        graph.add_edge(from, to, ());
    }

    let start = *index_of.get(spec.start.as_str()).ok_or_else(|| {
        GraphError::Configuration(format!("invalid entry point '{}'", spec.start))
    })?;

    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        start = spec.start.as_str(),
        "workflow compiled"
    );

    Ok(CompiledWorkflow {
        graph,
        start,
        recursion_limit: DEFAULT_RECURSION_LIMIT,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
