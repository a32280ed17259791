//! CLI command definitions and shared rendering for the `choreo` binary.
//!
//! Uses clap derive macros for argument parsing. Every command runs against
//! the simulated collaborators; `--fail` and `--no-decision` shape how they
//! misbehave.

pub mod classify;
pub mod demo;
pub mod plan;
pub mod playbook;
pub mod run;
pub mod scenarios;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Color};
use uuid::Uuid;

use choreo_infra::scenarios::{self as catalog, Scenario};
use choreo_types::collaborator::Capability;
use choreo_types::incident::{Incident, Severity};
use choreo_types::playbook::StageStatus;
use choreo_types::workflow::StepStatus;

/// Choreograph incident response across your tools.
#[derive(Parser)]
#[command(name = "choreo", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (defaults to `config.toml` in the data directory).
    #[arg(long, global = true, env = "CHOREO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Make every call to this collaborator fail (repeatable).
    #[arg(long = "fail", value_name = "COLLABORATOR", global = true)]
    pub fail: Vec<Capability>,

    /// Run without a decision service; plans fall back to severity rules.
    #[arg(long, global = true)]
    pub no_decision: bool,

    /// Simulated latency added to every collaborator call, in milliseconds.
    #[arg(long, default_value = "0", global = true)]
    pub latency_ms: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the canned incident scenarios.
    #[command(alias = "ls")]
    Scenarios,

    /// Plan and run a dynamic workflow for a scenario.
    Run {
        /// Scenario name (see `choreo scenarios`).
        scenario: String,
    },

    /// Run the fixed seven-stage playbook for a scenario.
    Playbook {
        /// Scenario name (see `choreo scenarios`).
        scenario: String,

        /// Repository to inspect during diagnostics (repeatable; overrides config).
        #[arg(long)]
        repo: Vec<String>,
    },

    /// Print the severity fallback plan.
    Plan {
        /// Incident severity (critical, high, medium, low).
        #[arg(long, short)]
        severity: Severity,
    },

    /// Ask the decision service to classify an incident report.
    Classify {
        /// Incident title.
        title: String,

        /// Longer description of the symptoms.
        #[arg(long, short, default_value = "")]
        description: String,
    },

    /// Run several scenarios concurrently and print the workflow registry.
    Demo {
        /// Scenarios to run (defaults to a representative trio).
        scenarios: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Resolve a scenario by name or fail with the list of known names.
pub(crate) fn find_scenario(name: &str) -> Result<&'static Scenario> {
    match catalog::find(name) {
        Some(scenario) => Ok(scenario),
        None => bail!(
            "Unknown scenario '{name}'. Available: {}",
            catalog::names().collect::<Vec<_>>().join(", ")
        ),
    }
}

/// First eight characters of an id, for tables.
pub(crate) fn short_id(id: Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

pub(crate) fn step_status_cell(status: StepStatus) -> Cell {
    match status {
        StepStatus::Pending => Cell::new("pending").fg(Color::Yellow),
        StepStatus::Running => Cell::new("running").fg(Color::Blue),
        StepStatus::Completed => Cell::new("completed").fg(Color::Green),
        StepStatus::Failed => Cell::new("failed").fg(Color::Red),
        StepStatus::Skipped => Cell::new("skipped").fg(Color::DarkGrey),
    }
}

pub(crate) fn stage_status_cell(status: StageStatus) -> Cell {
    match status {
        StageStatus::Completed => Cell::new("completed").fg(Color::Green),
        StageStatus::Partial => Cell::new("partial").fg(Color::Yellow),
        StageStatus::Failed => Cell::new("failed").fg(Color::Red),
    }
}

pub(crate) fn severity_cell(severity: Severity) -> Cell {
    let color = match severity {
        Severity::Critical => Color::Red,
        Severity::High => Color::Magenta,
        Severity::Medium => Color::Yellow,
        Severity::Low => Color::Grey,
    };
    Cell::new(severity.as_str()).fg(color)
}

/// Print the external references and responders written back to an incident.
pub(crate) fn print_incident_refs(incident: &Incident) {
    let field = |label: &str, value: Option<&String>| {
        let shown = match value {
            Some(v) => console::style(v.as_str()).cyan().to_string(),
            None => console::style("-").dim().to_string(),
        };
        println!("  {label:<12} {shown}");
    };
    field("Ticket:", incident.ticket_id.as_ref());
    field("Channel:", incident.channel_id.as_ref());
    field("Document:", incident.document_id.as_ref());
    field("Issue:", incident.issue_key.as_ref());
    if !incident.responder_ids.is_empty() {
        println!("  {:<12} {}", "Responders:", incident.responder_ids.join(", "));
    }
    if let Some(hypothesis) = &incident.hypothesis {
        println!();
        println!("  {}", console::style("Hypothesis").bold());
        println!("  {hypothesis}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_failure_flags() {
        let cli = Cli::parse_from([
            "choreo", "run", "database_outage", "--fail", "chat", "--fail", "ticketing", "--no-decision",
        ]);
        assert_eq!(cli.fail, vec![Capability::Chat, Capability::Ticketing]);
        assert!(cli.no_decision);
        assert!(matches!(cli.command, Commands::Run { ref scenario } if scenario == "database_outage"));
    }

    #[test]
    fn rejects_unknown_collaborator_and_severity() {
        assert!(Cli::try_parse_from(["choreo", "run", "x", "--fail", "pager"]).is_err());
        assert!(Cli::try_parse_from(["choreo", "plan", "--severity", "urgent"]).is_err());
    }

    #[test]
    fn unknown_scenario_lists_names() {
        let err = find_scenario("nope").unwrap_err().to_string();
        assert!(err.contains("database_outage"));
        assert!(find_scenario("network_issue").is_ok());
    }
}
