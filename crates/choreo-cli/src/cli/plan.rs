//! `choreo plan`: show the deterministic plan used when no recommendation
//! is available.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use choreo_core::workflow::builder::fallback_plan;
use choreo_types::incident::Severity;

pub fn show_plan(severity: Severity, json: bool) -> Result<()> {
    let steps = fallback_plan(severity);

    if json {
        let out = serde_json::json!({
            "severity": severity,
            "priority": severity.priority(),
            "steps": steps,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").fg(Color::Cyan),
            Cell::new("Step"),
            Cell::new("Action"),
            Cell::new("Target"),
        ]);
    for (i, step) in steps.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&step.name),
            Cell::new(&step.action),
            Cell::new(&step.target),
        ]);
    }

    println!();
    println!(
        "  Fallback plan for {} incidents ({})",
        style(severity.as_str()).cyan(),
        style(severity.priority()).bold()
    );
    println!();
    println!("{table}");
    println!();
    Ok(())
}
