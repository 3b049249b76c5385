//! `pwr schema`: write the workflow definition JSON schema.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use pipewright_core::graph::workflow_json_schema;

pub fn write_schema(out: &Path, json: bool) -> Result<()> {
    let schema = workflow_json_schema();
    let text = serde_json::to_string_pretty(&schema)?;
    std::fs::write(out, format!("{text}\n"))
        .with_context(|| format!("Failed to write {}", out.display()))?;

    if json {
        println!("{}", serde_json::json!({"written": out.display().to_string()}));
    } else {
        println!(
            "  {} Workflow schema written to {}",
            style("✓").green(),
            style(out.display()).cyan()
        );
    }
    Ok(())
}
