//! `choreo demo`: run several scenarios concurrently against one
//! choreographer, then show what the shared registry holds.

use std::sync::Arc;

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use tokio::task::JoinSet;

use choreo_core::workflow::choreographer::{Choreographer, OrchestrationOutcome};
use choreo_infra::scenarios::{demo_roster, DEMO_SEQUENCE};
use choreo_types::workflow::{StepStatus, Workflow};

use super::{find_scenario, severity_cell, short_id};
use crate::state::AppState;

pub async fn run_demo(state: &AppState, names: Vec<String>, json: bool) -> Result<()> {
    let names = if names.is_empty() {
        DEMO_SEQUENCE.iter().map(|s| s.to_string()).collect()
    } else {
        names
    };
    let scenarios = names
        .iter()
        .map(|name| find_scenario(name))
        .collect::<Result<Vec<_>>>()?;

    let choreographer = Arc::new(Choreographer::new(state.collaborators(), &state.config));

    let mut runs = JoinSet::new();
    for (order, scenario) in scenarios.iter().enumerate() {
        let choreographer = Arc::clone(&choreographer);
        let incident = scenario.incident();
        let name = scenario.name;
        runs.spawn(async move {
            let outcome = choreographer.orchestrate(incident, demo_roster()).await;
            (order, name, outcome)
        });
    }

    let mut outcomes = Vec::with_capacity(scenarios.len());
    while let Some(joined) = runs.join_next().await {
        outcomes.push(joined?);
    }
    outcomes.sort_by_key(|(order, _, _)| *order);

    let registry = choreographer.list_workflows();
    tracing::info!(runs = outcomes.len(), registered = registry.len(), "demo finished");

    if json {
        let runs: Vec<_> = outcomes
            .iter()
            .map(|(_, name, outcome)| {
                serde_json::json!({
                    "scenario": name,
                    "workflow_id": outcome.workflow.id,
                    "plan_source": outcome.plan_source,
                    "succeeded": outcome.workflow.succeeded(),
                    "completed_steps": outcome.workflow.count_by_status(StepStatus::Completed),
                    "failed_steps": outcome.workflow.count_by_status(StepStatus::Failed),
                })
            })
            .collect();
        let out = serde_json::json!({ "runs": runs, "registry": registry });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Ran {} scenarios concurrently",
        style("*").green().bold(),
        outcomes.len()
    );
    println!();
    println!("{}", runs_table(&outcomes));
    println!();
    println!("  {}", style("Workflow registry").bold());
    println!("{}", registry_table(&registry));
    println!(
        "  {}",
        style(format!("{} collaborator calls", state.calls().await.len())).dim()
    );
    println!();
    Ok(())
}

fn runs_table(outcomes: &[(usize, &'static str, OrchestrationOutcome)]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Scenario").fg(Color::Cyan),
            Cell::new("Severity"),
            Cell::new("Plan"),
            Cell::new("Completed"),
            Cell::new("Failed"),
            Cell::new("Ticket"),
            Cell::new("Channel"),
        ]);

    for (_, name, outcome) in outcomes {
        let workflow = &outcome.workflow;
        let failed = workflow.count_by_status(StepStatus::Failed);
        table.add_row(vec![
            Cell::new(name),
            severity_cell(outcome.incident.severity),
            Cell::new(outcome.plan_source.as_str()),
            Cell::new(format!(
                "{}/{}",
                workflow.count_by_status(StepStatus::Completed),
                workflow.steps.len()
            )),
            if failed > 0 {
                Cell::new(failed).fg(Color::Red)
            } else {
                Cell::new(failed)
            },
            Cell::new(outcome.incident.ticket_id.as_deref().unwrap_or("-")),
            Cell::new(outcome.incident.channel_id.as_deref().unwrap_or("-")),
        ]);
    }
    table
}

fn registry_table(workflows: &[Workflow]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Workflow").fg(Color::Cyan),
            Cell::new("Name"),
            Cell::new("Status"),
            Cell::new("Steps"),
            Cell::new("Completed"),
        ]);

    for w in workflows {
        let completed = w
            .completed_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(short_id(w.id)),
            Cell::new(&w.name),
            Cell::new(w.status.as_str()),
            Cell::new(w.steps.len()),
            Cell::new(completed),
        ]);
    }
    table
}
