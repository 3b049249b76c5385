//! `pwr list`: node types and registered strategies.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use crate::state::AppState;

/// Family name to its strategy names; both levels come back sorted.
fn strategy_catalog(state: &AppState) -> Result<serde_json::Map<String, serde_json::Value>> {
    let mut strategies = serde_json::Map::new();
    for family in state.strategies.list_families() {
        let names = state.strategies.list_names(family)?;
        strategies.insert(family.to_string(), serde_json::json!(names));
    }
    Ok(strategies)
}

pub fn list(state: &AppState, json: bool) -> Result<()> {
    let node_types = state.nodes.list();
    let strategies = strategy_catalog(state)?;

    if json {
        let out = serde_json::json!({
            "home": state.home.display().to_string(),
            "node_types": node_types,
            "strategies": strategies,
            "convenience": state.strategies.convenience_names(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("  {}", style("── Node types ──").dim());
    for node_type in &node_types {
        println!("  {}", style(node_type).cyan());
    }
    println!();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Family").fg(Color::White),
        Cell::new("Strategies").fg(Color::White),
    ]);
    for (family, names) in &strategies {
        let names = names
            .as_array()
            .map(|ns| {
                ns.iter()
                    .filter_map(|n| n.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(family).fg(Color::Cyan),
            Cell::new(names),
        ]);
    }
    println!("{table}");
    println!();

    Ok(())
}
