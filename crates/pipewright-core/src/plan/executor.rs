//! Sequential plan executor.
//!
//! Steps run strictly in declaration order. Each step resolves its argument
//! bundle against the run context, resolves its target in the strategy
//! registry, calls the strategy and records the return value under the step
//! ID. The first failure stops the run; outputs recorded so far stay on the
//! [`PlanRun`] for diagnostics.
//!
//! # Lifecycle
//!
//! ```text
//! Pending --(validate ok, first dispatch)--> Running --(last step + outputs)--> Completed
//!    |                                          |
//!    +--(bad version / malformed steps)--+------+--(reference, registry, strategy error)
//!                                        v
//!                                      Failed
//! ```

use std::collections::HashSet;

use pipewright_types::Kwargs;
use pipewright_types::plan::{Plan, PlanResult, PlanState, SUPPORTED_PLAN_VERSION};

use crate::registry::{RegistryError, StrategyError, StrategyRegistry};

use super::context::ExecutionContext;
use super::reference::{ReferenceError, VARS_ROOT};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("step '{step}': {source}")]
    Registry {
        step: String,
        #[source]
        source: RegistryError,
    },

    #[error("unresolved reference in {scope}: {source}")]
    Reference {
        scope: String,
        #[source]
        source: ReferenceError,
    },

    #[error("step '{step}' failed: {source}")]
    Execution {
        step: String,
        #[source]
        source: StrategyError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// PlanRun
// ---------------------------------------------------------------------------

/// State of one plan execution.
///
/// Created `Pending` for a plan; driven to `Completed` or `Failed` by
/// [`PlanExecutor::drive`].
#[derive(Debug, Clone)]
pub struct PlanRun {
    state: PlanState,
    context: ExecutionContext,
}

impl PlanRun {
    pub fn new(plan: &Plan) -> Self {
        Self::with_vars(plan, Kwargs::new())
    }

    /// Start a run whose variables are the plan's `vars` overlaid with
    /// `overrides`.
    pub fn with_vars(plan: &Plan, overrides: Kwargs) -> Self {
        let mut vars = plan.vars.clone();
        vars.extend(overrides);
        let declared = plan.steps.iter().filter_map(|s| s.id.clone());
        Self {
            state: PlanState::Pending,
            context: ExecutionContext::new(vars).with_declared_steps(declared),
        }
    }

    pub fn state(&self) -> PlanState {
        self.state
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Outputs of the steps that completed, in execution order.
    pub fn step_outputs(&self) -> &Kwargs {
        self.context.step_outputs()
    }
}

// ---------------------------------------------------------------------------
// PlanExecutor
// ---------------------------------------------------------------------------

/// Runs plans against a borrowed strategy registry.
#[derive(Debug, Clone, Copy)]
pub struct PlanExecutor<'r> {
    registry: &'r StrategyRegistry,
}

impl<'r> PlanExecutor<'r> {
    pub fn new(registry: &'r StrategyRegistry) -> Self {
        Self { registry }
    }

    /// Execute `plan` with its own variables.
    pub fn execute(&self, plan: &Plan) -> Result<PlanResult, PlanError> {
        let mut run = PlanRun::new(plan);
        self.drive(plan, &mut run)
    }

    /// Execute `plan` with caller variables overlaid on the plan's `vars`.
    pub fn execute_with_vars(&self, plan: &Plan, vars: Kwargs) -> Result<PlanResult, PlanError> {
        let mut run = PlanRun::with_vars(plan, vars);
        self.drive(plan, &mut run)
    }

    /// Drive a pending run to completion, updating its state.
    ///
    /// On failure the run is left `Failed` with the step outputs recorded
    /// before the failing step.
    pub fn drive(&self, plan: &Plan, run: &mut PlanRun) -> Result<PlanResult, PlanError> {
        if run.state != PlanState::Pending {
            return Err(PlanError::Configuration(format!(
                "plan run already {}",
                run.state
            )));
        }

        let result = self.drive_inner(plan, run);
        run.state = match &result {
            Ok(_) => PlanState::Completed,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    completed_steps = run.context.step_outputs().len(),
                    "plan failed"
                );
                PlanState::Failed
            }
        };
        result
    }

    fn drive_inner(&self, plan: &Plan, run: &mut PlanRun) -> Result<PlanResult, PlanError> {
        let steps = validate(plan)?;

        run.state = PlanState::Running;
        tracing::info!(steps = steps.len(), "plan started");

        for (id, target, args) in steps {
            let span = tracing::info_span!("plan_step", step_id = id, strategy = target);
            let _enter = span.enter();

            let kwargs = run
                .context
                .resolve_map(args)
                .map_err(|source| PlanError::Reference {
                    scope: format!("step '{id}'"),
                    source,
                })?;

            let (key, strategy) =
                self.registry
                    .resolve(target)
                    .map_err(|source| PlanError::Registry {
                        step: id.to_string(),
                        source,
                    })?;

            let output = strategy.call(kwargs).map_err(|source| PlanError::Execution {
                step: id.to_string(),
                source,
            })?;

            tracing::debug!(step_id = id, strategy = %key, "step completed");
            run.context.set_step_output(id, output);
        }

        let outputs = run
            .context
            .resolve_map(&plan.outputs)
            .map_err(|source| PlanError::Reference {
                scope: "outputs".to_string(),
                source,
            })?;

        tracing::info!(outputs = outputs.len(), "plan completed");

        Ok(PlanResult {
            version: plan.version,
            steps: run.context.step_outputs().clone(),
            outputs,
        })
    }
}

/// Structural checks done before any step runs.
///
/// Returns `(id, target, args)` per step in order.
fn validate(plan: &Plan) -> Result<Vec<(&str, &str, &Kwargs)>, PlanError> {
    if plan.version != SUPPORTED_PLAN_VERSION {
        return Err(PlanError::Configuration(format!(
            "unsupported plan version {} (expected {SUPPORTED_PLAN_VERSION})",
            plan.version
        )));
    }
    if plan.steps.is_empty() {
        return Err(PlanError::Configuration(
            "plan must declare at least one step".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(plan.steps.len());
    for (i, step) in plan.steps.iter().enumerate() {
        let id = step
            .id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| PlanError::Configuration(format!("step #{i} is missing an 'id'")))?;
        let target = step
            .target
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| PlanError::Configuration(format!("step '{id}' is missing 'use'")))?;

        if id == VARS_ROOT {
            return Err(PlanError::Configuration(format!(
                "step id '{VARS_ROOT}' is reserved"
            )));
        }
        if !seen.insert(id) {
            return Err(PlanError::Configuration(format!("duplicate step id '{id}'")));
        }
        out.push((id, target, &step.args));
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
