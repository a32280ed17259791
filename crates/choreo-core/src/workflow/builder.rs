//! Workflow planning: decision-service recommendation with a deterministic
//! severity-based fallback.
//!
//! The builder never fails. When the decision service is unavailable, errors,
//! returns text that cannot be parsed, or proposes an empty plan, the caller
//! receives [`fallback_plan`] for the incident's severity instead.

use std::sync::Arc;

use choreo_types::collaborator::Capability;
use choreo_types::config::FeatureFlags;
use choreo_types::error::DecisionError;
use choreo_types::incident::{Incident, Severity};
use choreo_types::workflow::{
    ActionKind, RawStepDescriptor, StepDescriptor, StepParameters, WorkflowStep,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::collaborator::DecisionProvider;

/// Defaults substituted for missing descriptor fields.
pub const DEFAULT_STEP_NAME: &str = "Unknown Step";
pub const DEFAULT_ACTION: &str = "unknown";
pub const DEFAULT_TARGET: &str = "unknown";

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Where a plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    Recommended,
    Fallback,
}

impl PlanSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanSource::Recommended => "recommended",
            PlanSource::Fallback => "fallback",
        }
    }
}

/// An ordered, validated step plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub steps: Vec<StepDescriptor>,
    pub source: PlanSource,
}

impl Plan {
    /// Materialize the plan into fresh pending workflow steps.
    pub fn into_steps(self) -> Vec<WorkflowStep> {
        self.steps.into_iter().map(WorkflowStep::from_descriptor).collect()
    }
}

// ---------------------------------------------------------------------------
// Pure planning helpers
// ---------------------------------------------------------------------------

/// Deterministic plan derived from severity alone. Total and reproducible.
pub fn fallback_plan(severity: Severity) -> Vec<StepDescriptor> {
    let mut steps = vec![
        StepDescriptor::new("Create Incident Ticket", ActionKind::CreateTicket, "ticketing"),
        StepDescriptor::new("Create Incident Channel", ActionKind::CreateChannel, "chat"),
    ];

    if severity.is_urgent() {
        steps.push(
            StepDescriptor::new("Notify Response Team", ActionKind::NotifyTeam, "chat")
                .with_parameter("urgency", json!("high")),
        );
        steps.push(
            StepDescriptor::new("Analyze Recent Changes", ActionKind::AnalyzeCommits, "code_host")
                .with_parameter("hours_back", json!(24)),
        );
    }

    steps.push(StepDescriptor::new(
        "Create Post-Mortem",
        ActionKind::CreatePostmortem,
        "documentation",
    ));
    steps
}

/// Collaborators offered to the decision service. Disabled capabilities are
/// omitted; the decision service itself is always listed.
pub fn available_collaborators(features: &FeatureFlags) -> Vec<Capability> {
    Capability::ALL
        .into_iter()
        .filter(|c| *c != Capability::Logging && features.is_enabled(*c))
        .collect()
}

/// Fill in defaults for any missing descriptor field.
pub fn normalize(raw: RawStepDescriptor) -> StepDescriptor {
    let parameters = match raw.parameters {
        Some(Value::Object(map)) => map,
        _ => StepParameters::new(),
    };
    StepDescriptor {
        name: non_empty(raw.name).unwrap_or_else(|| DEFAULT_STEP_NAME.to_string()),
        action: non_empty(raw.action).unwrap_or_else(|| DEFAULT_ACTION.to_string()),
        target: non_empty(raw.target).unwrap_or_else(|| DEFAULT_TARGET.to_string()),
        parameters,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse a decision-service text reply into raw descriptors.
///
/// Accepts a bare JSON array or one wrapped in a fenced code block
/// (```` ```json ... ``` ````).
pub fn parse_recommendation(text: &str) -> Result<Vec<RawStepDescriptor>, DecisionError> {
    let body = strip_code_fence(text.trim());
    let value: Value =
        serde_json::from_str(body).map_err(|e| DecisionError::Unparsable(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(DecisionError::Unparsable(
            "expected a JSON array of steps".to_string(),
        ));
    };
    items
        .into_iter()
        .map(|item| {
            if !item.is_object() {
                return Err(DecisionError::Unparsable(format!(
                    "step descriptor is not an object: {item}"
                )));
            }
            serde_json::from_value(item).map_err(|e| DecisionError::Unparsable(e.to_string()))
        })
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line.
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

// ---------------------------------------------------------------------------
// WorkflowBuilder
// ---------------------------------------------------------------------------

/// Turns an incident into an ordered step plan.
pub struct WorkflowBuilder {
    decision: Arc<dyn DecisionProvider>,
}

impl WorkflowBuilder {
    pub fn new(decision: Arc<dyn DecisionProvider>) -> Self {
        Self { decision }
    }

    /// Build a plan for `incident`. Never fails: planning errors fall back to
    /// the severity plan.
    pub async fn build(&self, incident: &Incident, available: &[Capability]) -> Plan {
        match self.decision.recommend_steps(incident, available).await {
            Ok(raw) if !raw.is_empty() => {
                let steps: Vec<StepDescriptor> = raw.into_iter().map(normalize).collect();
                tracing::debug!(
                    incident_id = %incident.id,
                    steps = steps.len(),
                    "using recommended plan"
                );
                Plan {
                    steps,
                    source: PlanSource::Recommended,
                }
            }
            Ok(_) => {
                tracing::warn!(
                    incident_id = %incident.id,
                    "decision service proposed an empty plan, using fallback"
                );
                self.fallback(incident)
            }
            Err(e) => {
                tracing::warn!(
                    incident_id = %incident.id,
                    error = %e,
                    "plan recommendation failed, using fallback"
                );
                self.fallback(incident)
            }
        }
    }

    fn fallback(&self, incident: &Incident) -> Plan {
        Plan {
            steps: fallback_plan(incident.severity),
            source: PlanSource::Fallback,
        }
    }
}
