//! Declarative plan execution.
//!
//! - `reference` -- `${{ ... }}` envelope detection and path parser
//! - `context` -- per-run variables and step outputs, reference resolution
//! - `executor` -- sequential step executor and run lifecycle
//! - `definition` -- plan file parsing and loading

pub mod context;
pub mod definition;
pub mod executor;
pub mod reference;

pub use context::ExecutionContext;
pub use definition::{load_plan_file, parse_plan_json, parse_plan_value, parse_plan_yaml, run_plan_file};
pub use executor::{PlanError, PlanExecutor, PlanRun};
pub use reference::{ReferenceError, ReferencePath};
