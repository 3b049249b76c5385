//! `pwr workflow` subcommands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use console::style;

use pipewright_core::graph::{compile_workflow, load_workflow_file};

use crate::state::AppState;

#[derive(Subcommand)]
pub enum WorkflowCommand {
    /// Compile a workflow file and invoke it once.
    Run {
        /// Workflow YAML file.
        file: PathBuf,

        /// Initial state as a JSON object.
        #[arg(long)]
        state: Option<String>,

        /// Override the configured recursion limit.
        #[arg(long)]
        recursion_limit: Option<usize>,
    },

    /// Compile a workflow file and print its nodes and successors.
    Check {
        /// Workflow YAML file.
        file: PathBuf,
    },
}

pub fn handle_workflow_command(
    cmd: WorkflowCommand,
    state: &AppState,
    json: bool,
    quiet: bool,
) -> Result<()> {
    match cmd {
        WorkflowCommand::Run {
            file,
            state: initial,
            recursion_limit,
        } => handle_run(&file, initial.as_deref(), recursion_limit, state, json, quiet),
        WorkflowCommand::Check { file } => handle_check(&file, state, json),
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

fn handle_run(
    file: &Path,
    initial: Option<&str>,
    recursion_limit: Option<usize>,
    state: &AppState,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let initial = super::parse_json_object("state", initial)?;
    let spec = load_workflow_file(file)
        .with_context(|| format!("Failed to load workflow {}", file.display()))?;
    let limit = recursion_limit.unwrap_or(state.config.workflow.recursion_limit);
    let compiled = compile_workflow(&spec, &state.nodes, &state.strategies)
        .context("Workflow compilation failed")?
        .with_recursion_limit(limit);

    let final_state = compiled
        .invoke(initial)
        .with_context(|| format!("Workflow {} failed", file.display()))?;

    if !json && !quiet {
        eprintln!(
            "  {} workflow finished from '{}'",
            style("✓").green(),
            style(compiled.start()).cyan()
        );
    }
    println!("{}", serde_json::to_string_pretty(&final_state)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Check
// ---------------------------------------------------------------------------

fn handle_check(file: &Path, state: &AppState, json: bool) -> Result<()> {
    let spec = load_workflow_file(file)
        .with_context(|| format!("Failed to load workflow {}", file.display()))?;
    let compiled = compile_workflow(&spec, &state.nodes, &state.strategies)
        .context("Workflow compilation failed")?;

    if json {
        let nodes: Vec<_> = compiled
            .node_ids()
            .into_iter()
            .map(|id| serde_json::json!({"id": id, "successors": compiled.successor_ids(id)}))
            .collect();
        let out = serde_json::json!({"start": compiled.start(), "nodes": nodes});
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Workflow compiled (start: {})",
        style("✓").green().bold(),
        style(compiled.start()).cyan()
    );
    println!();
    for id in compiled.node_ids() {
        let successors = compiled.successor_ids(id);
        let arrow = if successors.is_empty() {
            style("(end)".to_string()).dim()
        } else {
            style(successors.join(", ")).dim()
        };
        println!("  {} -> {}", style(id).bold(), arrow);
    }
    println!();
    Ok(())
}
