//! `choreo playbook`: run the fixed seven-stage playbook for one scenario.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use choreo_core::playbook::IncidentPlaybook;
use choreo_infra::scenarios::demo_roster;
use choreo_types::playbook::{PlaybookResult, StageStatus};

use super::{find_scenario, print_incident_refs, short_id, stage_status_cell};
use crate::state::AppState;

pub async fn run_playbook(state: &AppState, name: &str, repos: &[String], json: bool) -> Result<()> {
    let scenario = find_scenario(name)?;
    let playbook = IncidentPlaybook::new(state.collaborators(), state.config.playbook.clone());
    let roster = demo_roster();

    let mut incident = scenario.incident();
    let repositories = (!repos.is_empty()).then_some(repos);
    let result = playbook.run(&mut incident, repositories, &roster).await;

    if json {
        let out = serde_json::json!({
            "scenario": scenario.name,
            "result": result,
            "incident": incident,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let marker = if result.success {
        style("*").green().bold()
    } else {
        style("!").red().bold()
    };
    println!();
    println!(
        "  {} {} for incident {} ({})",
        marker,
        style(&result.workflow_name).cyan(),
        short_id(incident.id),
        incident.severity
    );
    println!();
    println!("{}", stages_table(&result));

    let partial = result
        .stages
        .iter()
        .filter(|s| s.status != StageStatus::Completed)
        .count();
    if partial > 0 {
        println!(
            "  {}",
            style(format!("{partial} stage(s) did not fully complete")).yellow()
        );
    }
    for error in &result.errors {
        println!("  {} {}", style("fault:").red().bold(), error);
    }
    println!();
    print_incident_refs(&incident);
    println!();
    Ok(())
}

fn stages_table(result: &PlaybookResult) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").fg(Color::Cyan),
            Cell::new("Stage"),
            Cell::new("Status"),
            Cell::new("Details"),
            Cell::new("Error"),
        ]);

    for stage in &result.stages {
        let keys = stage.details.keys().cloned().collect::<Vec<_>>().join(", ");
        table.add_row(vec![
            Cell::new(stage.stage.number()),
            Cell::new(stage.stage.title()),
            stage_status_cell(stage.status),
            Cell::new(keys),
            Cell::new(stage.error.as_deref().unwrap_or("-")),
        ]);
    }
    table
}
