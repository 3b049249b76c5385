//! Workflow spec parsing and schema export.

use std::path::Path;

use pipewright_types::workflow::WorkflowSpec;

use super::compiler::GraphError;

/// Parse a YAML string into a `WorkflowSpec`.
pub fn parse_workflow_yaml(yaml: &str) -> Result<WorkflowSpec, GraphError> {
    serde_yaml_ng::from_str(yaml).map_err(|e| GraphError::Parse(e.to_string()))
}

/// Load a workflow spec; `.json` files as JSON, everything else as YAML.
pub fn load_workflow_file(path: &Path) -> Result<WorkflowSpec, GraphError> {
    let content = std::fs::read_to_string(path)?;
    if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&content).map_err(|e| GraphError::Parse(e.to_string()))
    } else {
        parse_workflow_yaml(&content)
    }
}

/// JSON Schema for workflow spec files, for editor tooling.
pub fn workflow_json_schema() -> serde_json::Value {
    schemars::schema_for!(WorkflowSpec).to_value()
}
