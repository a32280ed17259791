//! `choreo scenarios`: list the canned incident scenarios.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};

use choreo_infra::scenarios::SCENARIOS;

use super::severity_cell;

pub fn list_scenarios(json: bool) -> Result<()> {
    if json {
        let out: Vec<_> = SCENARIOS
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name,
                    "title": s.title,
                    "severity": s.severity,
                    "category": s.category,
                    "services": s.services,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").fg(Color::Cyan),
            Cell::new("Severity"),
            Cell::new("Category"),
            Cell::new("Title"),
        ]);
    for s in &SCENARIOS {
        table.add_row(vec![
            Cell::new(s.name),
            severity_cell(s.severity),
            Cell::new(s.category.as_str()),
            Cell::new(s.title),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}
