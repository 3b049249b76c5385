//! Workflow graph specification.
//!
//! A workflow is a small DAG of stateful nodes sharing one mutable state
//! mapping. Nodes are instantiated from a registered node type and a
//! parameter bundle; edges carry the state from one node to the next.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Kwargs;

/// A declared workflow: entry node, node declarations, directed edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowSpec {
    /// ID of the node that receives the initial state.
    pub start: String,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

/// A node declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NodeSpec {
    /// Unique node ID within the workflow.
    pub id: String,
    /// Registered node type (e.g. `strategy.chunking`).
    #[serde(rename = "type")]
    pub node_type: String,
    /// Constructor parameters for the node.
    #[serde(default)]
    pub params: Kwargs,
}

/// A directed edge between two declared nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EdgeSpec {
    pub source: String,
    pub target: String,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>, params: Kwargs) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            params,
        }
    }
}

impl EdgeSpec {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}
