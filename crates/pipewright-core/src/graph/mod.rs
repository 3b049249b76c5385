//! Workflow graph compilation and execution.
//!
//! - `compiler` -- spec to petgraph digraph, superstep runner
//! - `definition` -- YAML/JSON loading and JSON Schema export

pub mod compiler;
pub mod definition;

pub use compiler::{CompiledWorkflow, DEFAULT_RECURSION_LIMIT, GraphError, compile_workflow};
pub use definition::{load_workflow_file, parse_workflow_yaml, workflow_json_schema};
