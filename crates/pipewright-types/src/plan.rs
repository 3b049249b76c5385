//! Declarative plan types.
//!
//! A plan is an ordered list of steps, each naming a registered strategy
//! (`use`) and a keyword-argument bundle (`with`) that may contain
//! `${{ ... }}` references to variables or prior step outputs.
//!
//! ```yaml
//! version: 1
//! vars:
//!   question: "What is the budget?"
//! steps:
//!   - id: chunks
//!     use: chunking.fixed
//!     with: { data: "${{ vars.document }}", chunk_size: 200 }
//! outputs:
//!   first: "${{ chunks[0].text }}"
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Kwargs;

/// The only plan format version this engine understands.
pub const SUPPORTED_PLAN_VERSION: u32 = 1;

fn default_version() -> u32 {
    SUPPORTED_PLAN_VERSION
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// A parsed plan file.
///
/// Step `id`/`use` are optional at the serde level so that a malformed step
/// surfaces as a configuration error from the executor rather than an opaque
/// parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan format version. Missing means the current version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Initial variables, addressable as `${{ vars.<name> }}`.
    #[serde(default)]
    pub vars: Kwargs,
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<PlanStep>,
    /// Output name -> literal or reference, resolved after the last step.
    #[serde(default)]
    pub outputs: Kwargs,
}

/// A single plan step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Unique step ID; later steps reference the output as `${{ <id> }}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `family.name` or a bare strategy name.
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Keyword arguments, possibly containing references.
    #[serde(default, rename = "with")]
    pub args: Kwargs,
}

impl PlanStep {
    /// Convenience constructor used by programmatic callers and tests.
    pub fn new(id: impl Into<String>, target: impl Into<String>, args: Kwargs) -> Self {
        Self {
            id: Some(id.into()),
            target: Some(target.into()),
            args,
        }
    }
}

// ---------------------------------------------------------------------------
// Result + lifecycle
// ---------------------------------------------------------------------------

/// Result bundle of a completed plan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub version: u32,
    /// Every step's return value, in execution order.
    pub steps: Kwargs,
    /// Resolved `outputs` block (empty when the plan declared none).
    pub outputs: Kwargs,
}

/// Lifecycle of a single plan execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanState {
    /// Loaded, no step dispatched yet.
    Pending,
    /// Steps executing in order.
    Running,
    /// All steps ran and outputs resolved.
    Completed,
    /// A structural error, reference error or strategy error stopped the run.
    Failed,
}

impl std::fmt::Display for PlanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanState::Pending => write!(f, "pending"),
            PlanState::Running => write!(f, "running"),
            PlanState::Completed => write!(f, "completed"),
            PlanState::Failed => write!(f, "failed"),
        }
    }
}

/// Convert any JSON value into a plan, requiring a mapping at the top level.
impl TryFrom<Value> for Plan {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        if !value.is_object() {
            return Err(format!(
                "plan must be a mapping at the top level, got {}",
                json_type_name(&value)
            ));
        }
        serde_json::from_value(value).map_err(|e| e.to_string())
    }
}

/// Human-readable name of a JSON value's runtime type.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
