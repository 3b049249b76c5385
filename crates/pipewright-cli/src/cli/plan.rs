//! `pwr plan` subcommands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use console::style;

use pipewright_core::plan::run_plan_file;

use crate::state::AppState;

#[derive(Subcommand)]
pub enum PlanCommand {
    /// Execute a plan file and print its result bundle.
    Run {
        /// Plan file (`.json`, otherwise YAML).
        file: PathBuf,

        /// JSON object merged over the plan's `vars`.
        #[arg(long)]
        vars: Option<String>,
    },
}

/// The result bundle always goes to stdout as JSON; the summary line goes
/// to stderr unless `--json` or `--quiet`.
pub fn handle_plan_command(cmd: PlanCommand, state: &AppState, json: bool, quiet: bool) -> Result<()> {
    match cmd {
        PlanCommand::Run { file, vars } => {
            let vars = super::parse_json_object("vars", vars.as_deref())?;
            let result = run_plan_file(&state.strategies, &file, vars)
                .with_context(|| format!("Plan {} failed", file.display()))?;

            if !json && !quiet {
                eprintln!(
                    "  {} {} step(s) completed",
                    style("✓").green(),
                    result.steps.len()
                );
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}
