//! `pwr plugins`: load manifests and print the load summary.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use pipewright_core::plugin::{LoadOptions, load_plugins};
use pipewright_types::plugin::{PluginLoadResult, PluginStatus};

use crate::state::AppState;

/// Load `files` on top of the already-initialized registry.
pub fn load(state: &mut AppState, files: &[PathBuf], json: bool) -> Result<()> {
    let options = LoadOptions {
        require_any: state.config.plugins.require_any,
        reexport_family: state.config.plugins.reexport_family.clone(),
    };
    let results = load_plugins(&mut state.strategies, files, &options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    print_summary(&results);
    Ok(())
}

fn status_cell(status: PluginStatus) -> Cell {
    let color = match status {
        PluginStatus::Loaded => Color::Green,
        PluginStatus::NotFound => Color::Yellow,
        PluginStatus::ImportError => Color::Red,
    };
    Cell::new(status.to_string()).fg(color)
}

fn print_summary(results: &[PluginLoadResult]) {
    println!();
    if results.is_empty() {
        println!("  {}", style("No plugin manifests found.").dim());
        println!();
        return;
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Path").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Registered").fg(Color::White),
        Cell::new("Error").fg(Color::White),
    ]);
    for result in results {
        let registered = result
            .registered
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(result.path.display()).fg(Color::Cyan),
            status_cell(result.status),
            Cell::new(registered),
            Cell::new(result.error.as_deref().unwrap_or("")).fg(Color::DarkGrey),
        ]);
    }
    println!("{table}");
    println!();
}
