//! Pipewright CLI entry point.
//!
//! Binary name: `pwr`
//!
//! Parses arguments, installs logging, builds the registries from config,
//! installed plugins and `--plugins`, then dispatches to a command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use pipewright_observe::{TracingOptions, directive_for_verbosity, init_tracing, shutdown_tracing};
use pipewright_types::config::LogFormat;

use cli::{Cli, Commands};
use state::AppState;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions and version need neither logging nor registries
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(*shell, &mut cmd, "pwr", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Version => {
            if cli.json {
                println!("{}", serde_json::json!({"version": env!("CARGO_PKG_VERSION")}));
            } else {
                println!("pwr {}", env!("CARGO_PKG_VERSION"));
            }
            return Ok(());
        }
        _ => {}
    }

    let (_, config) = AppState::config_only(cli.config.as_deref());
    let options = TracingOptions {
        json: config.logging.format == LogFormat::Json,
        default_directive: directive_for_verbosity(cli.verbose, cli.quiet).to_string(),
        enable_otel: std::env::var_os("PIPEWRIGHT_OTEL").is_some(),
    };
    if let Err(e) = init_tracing(&options) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let result = run(cli);
    shutdown_tracing();
    result
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Schema { out } = &cli.command {
        return cli::schema::write_schema(out, cli.json);
    }

    let mut state = AppState::init(cli.config.as_deref(), &cli.plugins)?;

    match cli.command {
        Commands::List => cli::list::list(&state, cli.json)?,
        Commands::Plan { action } => {
            cli::plan::handle_plan_command(action, &state, cli.json, cli.quiet)?;
        }
        Commands::Workflow { action } => {
            cli::workflow::handle_workflow_command(action, &state, cli.json, cli.quiet)?;
        }
        Commands::Plugins { files } => cli::plugins::load(&mut state, &files, cli.json)?,
        Commands::Schema { .. } | Commands::Version | Commands::Completions { .. } => {}
    }

    Ok(())
}
