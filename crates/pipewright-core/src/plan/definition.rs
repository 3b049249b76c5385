//! Plan file loading.
//!
//! `.json` files are parsed as JSON, everything else as YAML. Either way the
//! document must be a mapping at the top level.

use std::path::Path;

use pipewright_types::Kwargs;
use pipewright_types::plan::{Plan, PlanResult};
use serde_json::Value;

use crate::registry::StrategyRegistry;

use super::executor::{PlanError, PlanExecutor};

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a YAML document into a `Plan`.
pub fn parse_plan_yaml(yaml: &str) -> Result<Plan, PlanError> {
    let value: Value = serde_yaml_ng::from_str(yaml)
        .map_err(|e| PlanError::Configuration(format!("invalid plan YAML: {e}")))?;
    parse_plan_value(value)
}

/// Parse a JSON document into a `Plan`.
pub fn parse_plan_json(json: &str) -> Result<Plan, PlanError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| PlanError::Configuration(format!("invalid plan JSON: {e}")))?;
    parse_plan_value(value)
}

/// Convert an already-parsed document into a `Plan`.
pub fn parse_plan_value(value: Value) -> Result<Plan, PlanError> {
    Plan::try_from(value).map_err(PlanError::Configuration)
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

pub fn load_plan_file(path: &Path) -> Result<Plan, PlanError> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        parse_plan_json(&content)
    } else {
        parse_plan_yaml(&content)
    }
}

/// Load and execute a plan file, overlaying `vars` on the plan's own.
pub fn run_plan_file(
    registry: &StrategyRegistry,
    path: &Path,
    vars: Kwargs,
) -> Result<PlanResult, PlanError> {
    let plan = load_plan_file(path)?;
    tracing::info!(path = %path.display(), "running plan file");
    PlanExecutor::new(registry).execute_with_vars(&plan, vars)
}
