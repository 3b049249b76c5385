//! Workflow node types and their constructors.

use std::sync::Arc;

use indexmap::IndexMap;
use pipewright_types::Kwargs;

use super::strategy::{StrategyError, StrategyRegistry};

/// Mutable state mapping threaded through a workflow run.
pub type WorkflowState = Kwargs;

/// A stateful workflow node.
pub trait WorkflowNode: Send + Sync {
    /// Consume the state, return the (possibly modified) state.
    fn call(&self, state: WorkflowState) -> Result<WorkflowState, StrategyError>;
}

/// Builds a node from its parameter bundle.
///
/// Constructors get read access to the strategy registry so strategy-backed
/// nodes can bind their callable at compile time.
pub type NodeConstructor = Arc<
    dyn Fn(&StrategyRegistry, Kwargs) -> Result<Box<dyn WorkflowNode>, StrategyError>
        + Send
        + Sync,
>;

/// Registry of node types, keyed by type name (e.g. `strategy.rerank`).
#[derive(Default, Clone)]
pub struct NodeRegistry {
    constructors: IndexMap<String, NodeConstructor>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node constructor. Re-registration overwrites.
    pub fn register<F>(&mut self, node_type: &str, constructor: F)
    where
        F: Fn(&StrategyRegistry, Kwargs) -> Result<Box<dyn WorkflowNode>, StrategyError>
            + Send
            + Sync
            + 'static,
    {
        self.constructors
            .insert(node_type.to_string(), Arc::new(constructor));
    }

    pub fn get(&self, node_type: &str) -> Option<&NodeConstructor> {
        self.constructors.get(node_type)
    }

    /// Node type names, sorted for display.
    pub fn list(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("types", &self.list())
            .finish()
    }
}

/// Adapter so plain closures over the state can act as nodes.
pub struct FnNode<F>(pub F);

impl<F> WorkflowNode for FnNode<F>
where
    F: Fn(WorkflowState) -> Result<WorkflowState, StrategyError> + Send + Sync,
{
    fn call(&self, state: WorkflowState) -> Result<WorkflowState, StrategyError> {
        (self.0)(state)
    }
}
