//! CLI command definitions for the `pwr` binary.
//!
//! Uses clap derive macros; the command layout is verb-noun
//! (`pwr plan run`, `pwr workflow run`).

pub mod list;
pub mod plan;
pub mod plugins;
pub mod schema;
pub mod workflow;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use pipewright_types::Kwargs;
use serde_json::Value;

/// Run strategy plans and workflow graphs.
#[derive(Parser)]
#[command(name = "pwr", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for info, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (default: ~/.pipewright/config.toml).
    #[arg(long, global = true, env = "PIPEWRIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Extra plugin manifest or directory; repeatable.
    #[arg(long = "plugins", global = true)]
    pub plugins: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List node types and registered strategies.
    #[command(alias = "ls")]
    List,

    /// Plan operations.
    Plan {
        #[command(subcommand)]
        action: plan::PlanCommand,
    },

    /// Workflow graph operations.
    Workflow {
        #[command(subcommand)]
        action: workflow::WorkflowCommand,
    },

    /// Load plugin manifests and report what each registered.
    Plugins {
        /// Manifest files or directories.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Write the workflow definition JSON schema.
    Schema {
        /// Output path.
        out: PathBuf,
    },

    /// Print the version.
    Version,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Parse a `--vars`/`--state` argument into a mapping.
pub fn parse_json_object(flag: &str, raw: Option<&str>) -> Result<Kwargs> {
    let Some(raw) = raw else {
        return Ok(Kwargs::new());
    };
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("--{flag} is not valid JSON"))?;
    match value {
        Value::Object(map) => Ok(map),
        other => bail!(
            "--{flag} must be a JSON object, got {}",
            pipewright_types::plan::json_type_name(&other)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plan_run_with_globals() {
        let cli = Cli::try_parse_from([
            "pwr", "--json", "-vv", "--plugins", "a.yaml", "--plugins", "dir", "plan", "run",
            "plan.yaml", "--vars", "{\"x\": 1}",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.plugins.len(), 2);
        match cli.command {
            Commands::Plan {
                action: plan::PlanCommand::Run { file, vars },
            } => {
                assert_eq!(file, PathBuf::from("plan.yaml"));
                assert_eq!(vars.as_deref(), Some("{\"x\": 1}"));
            }
            _ => panic!("expected plan run"),
        }
    }

    #[test]
    fn test_plugins_requires_files() {
        assert!(Cli::try_parse_from(["pwr", "plugins"]).is_err());
    }

    // -----------------------------------------------------------------------
    // parse_json_object
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_json_object() {
        assert!(parse_json_object("vars", None).unwrap().is_empty());
        let map = parse_json_object("vars", Some(r#"{"a": [1]}"#)).unwrap();
        assert_eq!(map["a"], serde_json::json!([1]));
        let err = parse_json_object("state", Some("[1, 2]")).unwrap_err();
        assert!(err.to_string().contains("--state must be a JSON object"));
        assert!(parse_json_object("vars", Some("{")).is_err());
    }
}
