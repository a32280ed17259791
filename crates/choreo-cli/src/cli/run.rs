//! `choreo run`: plan and execute a dynamic workflow for one scenario.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use choreo_core::workflow::choreographer::{Choreographer, OrchestrationOutcome};
use choreo_infra::scenarios::demo_roster;
use choreo_types::workflow::{StepStatus, Workflow};

use super::{find_scenario, print_incident_refs, short_id, step_status_cell};
use crate::state::AppState;

/// Longest step message shown in the table.
const MAX_MESSAGE_CHARS: usize = 60;

pub async fn run_scenario(state: &AppState, name: &str, json: bool) -> Result<()> {
    let scenario = find_scenario(name)?;
    let choreographer = Choreographer::new(state.collaborators(), &state.config);

    let outcome = choreographer
        .orchestrate(scenario.incident(), demo_roster())
        .await;

    if json {
        let out = serde_json::json!({
            "scenario": scenario.name,
            "plan_source": outcome.plan_source,
            "succeeded": outcome.workflow.succeeded(),
            "workflow": outcome.workflow,
            "incident": outcome.incident,
            "collaborator_calls": state.calls().await.len(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_outcome(&outcome);
    println!(
        "  {}",
        style(format!("{} collaborator calls", state.calls().await.len())).dim()
    );
    println!();
    Ok(())
}

pub(crate) fn print_outcome(outcome: &OrchestrationOutcome) {
    let workflow = &outcome.workflow;
    let marker = if workflow.succeeded() {
        style("*").green().bold()
    } else {
        style("!").red().bold()
    };

    println!();
    println!(
        "  {} {} ({} plan, workflow {})",
        marker,
        style(&workflow.name).cyan(),
        outcome.plan_source.as_str(),
        short_id(workflow.id)
    );
    println!(
        "  Incident {}: {} / {}",
        short_id(outcome.incident.id),
        outcome.incident.severity,
        outcome.incident.category
    );
    println!();
    println!("{}", steps_table(workflow));
    println!(
        "  {} completed, {} failed, {} skipped",
        style(workflow.count_by_status(StepStatus::Completed)).green(),
        style(workflow.count_by_status(StepStatus::Failed)).red(),
        workflow.count_by_status(StepStatus::Skipped)
    );
    for error in &workflow.errors {
        println!("  {} {}", style("fault:").red().bold(), error);
    }
    println!();
    print_incident_refs(&outcome.incident);
    println!();
}

fn steps_table(workflow: &Workflow) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").fg(Color::Cyan),
            Cell::new("Step"),
            Cell::new("Action"),
            Cell::new("Status"),
            Cell::new("Detail"),
        ]);

    for (i, step) in workflow.steps.iter().enumerate() {
        let detail = match (&step.error, &step.result) {
            (Some(error), _) => error.clone(),
            (None, Some(result)) => result.message.clone(),
            (None, None) => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&step.name),
            Cell::new(&step.action),
            step_status_cell(step.status),
            Cell::new(detail.chars().take(MAX_MESSAGE_CHARS).collect::<String>()),
        ]);
    }
    table
}
