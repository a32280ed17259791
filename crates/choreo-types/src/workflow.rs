//! Workflow domain types: the ordered plan of actions executed for one incident.
//!
//! A `Workflow` is created at run start from a list of `WorkflowStep`s and is
//! only ever advanced forward. Step ordering is fixed once the run starts;
//! only status, result, error and timestamps change afterwards.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::ActionResult;
use crate::collaborator::Capability;

/// Parameter mapping attached to a step.
pub type StepParameters = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

/// Closed set of actions the dispatcher knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CreateTicket,
    UpdateTicket,
    CreateChannel,
    NotifyTeam,
    AssembleTeam,
    AnalyzeCommits,
    GatherLogs,
    CreatePostmortem,
    GenerateHypothesis,
    SearchKnowledge,
    PostUpdate,
    CreateIssue,
}

impl ActionKind {
    pub const ALL: [ActionKind; 12] = [
        ActionKind::CreateTicket,
        ActionKind::UpdateTicket,
        ActionKind::CreateChannel,
        ActionKind::NotifyTeam,
        ActionKind::AssembleTeam,
        ActionKind::AnalyzeCommits,
        ActionKind::GatherLogs,
        ActionKind::CreatePostmortem,
        ActionKind::GenerateHypothesis,
        ActionKind::SearchKnowledge,
        ActionKind::PostUpdate,
        ActionKind::CreateIssue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CreateTicket => "create_ticket",
            ActionKind::UpdateTicket => "update_ticket",
            ActionKind::CreateChannel => "create_channel",
            ActionKind::NotifyTeam => "notify_team",
            ActionKind::AssembleTeam => "assemble_team",
            ActionKind::AnalyzeCommits => "analyze_commits",
            ActionKind::GatherLogs => "gather_logs",
            ActionKind::CreatePostmortem => "create_postmortem",
            ActionKind::GenerateHypothesis => "generate_hypothesis",
            ActionKind::SearchKnowledge => "search_knowledge",
            ActionKind::PostUpdate => "post_update",
            ActionKind::CreateIssue => "create_issue",
        }
    }

    /// Collaborator capability the action's handler depends on.
    pub fn capability(&self) -> Capability {
        match self {
            ActionKind::CreateTicket | ActionKind::UpdateTicket => Capability::Ticketing,
            ActionKind::CreateChannel
            | ActionKind::NotifyTeam
            | ActionKind::AssembleTeam
            | ActionKind::PostUpdate => Capability::Chat,
            ActionKind::AnalyzeCommits => Capability::CodeHost,
            ActionKind::GatherLogs => Capability::Logging,
            ActionKind::CreatePostmortem | ActionKind::SearchKnowledge => Capability::Documentation,
            ActionKind::GenerateHypothesis => Capability::Decision,
            ActionKind::CreateIssue => Capability::IssueTracker,
        }
    }

    /// Resolve a symbolic action identifier. Unknown identifiers yield `None`.
    pub fn parse(action: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == action)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown action: '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Step descriptors (plan shape before a run starts)
// ---------------------------------------------------------------------------

/// A step descriptor as proposed by the decision service. Every field may be
/// missing; the builder substitutes defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStepDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, alias = "target_tool")]
    pub target: Option<String>,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
}

/// A validated step descriptor: every field is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub name: String,
    pub action: String,
    pub target: String,
    #[serde(default)]
    pub parameters: StepParameters,
}

impl StepDescriptor {
    pub fn new(name: impl Into<String>, action: ActionKind, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: action.as_str().to_string(),
            target: target.into(),
            parameters: StepParameters::new(),
        }
    }

    pub fn with_parameter(mut self, key: &str, value: serde_json::Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }
}

// ---------------------------------------------------------------------------
// WorkflowStep
// ---------------------------------------------------------------------------

/// Status of an individual step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    /// Whether the step has finished (completed, failed or skipped).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a workflow.
///
/// `result` is present iff `status == Completed` (or `Skipped`, which carries
/// the skip notice); `error` is present iff `status == Failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: Uuid,
    pub name: String,
    /// Symbolic action identifier; kept as text so unknown actions survive
    /// planning and fail at dispatch.
    pub action: String,
    /// Informational collaborator identifier.
    pub target: String,
    #[serde(default)]
    pub parameters: StepParameters,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ActionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowStep {
    pub fn from_descriptor(descriptor: StepDescriptor) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: descriptor.name,
            action: descriptor.action,
            target: descriptor.target,
            parameters: descriptor.parameters,
            status: StepStatus::Pending,
            result: None,
            error: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// Typed action, if the identifier is known.
    pub fn kind(&self) -> Option<ActionKind> {
        ActionKind::parse(&self.action)
    }

    /// Mark the step as running and stamp its start time.
    pub fn start(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Record the outcome of a dispatched step.
    pub fn finish(&mut self, result: ActionResult) {
        if result.is_skipped() {
            self.status = StepStatus::Skipped;
            self.error = None;
            self.result = Some(result);
        } else if result.success {
            self.status = StepStatus::Completed;
            self.error = None;
            self.result = Some(result);
        } else {
            self.status = StepStatus::Failed;
            self.error = Some(
                result
                    .error
                    .clone()
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| result.message.clone()),
            );
            self.result = None;
        }
        self.completed_at = Some(Utc::now());
    }

    /// Fail a step that was interrupted before its handler returned.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = StepStatus::Failed;
        self.error = Some(error.into());
        self.result = None;
        self.completed_at = Some(Utc::now());
    }

    /// Mark a never-dispatched step as skipped.
    pub fn skip(&mut self) {
        self.status = StepStatus::Skipped;
        self.completed_at = Some(Utc::now());
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// Overall status of a workflow. There is no failed terminal state:
/// step failures live on the steps, top-level faults in `errors`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Pending,
    Running,
    Completed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::Running => "running",
            WorkflowStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered sequence of steps executed for one incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub incident_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<WorkflowStep>,
    /// Index of the next step to dispatch. Never decreases.
    pub current_step_index: usize,
    pub status: WorkflowStatus,
    /// Top-level faults. Non-empty means the run did not finish cleanly.
    #[serde(default)]
    pub errors: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Workflow {
    pub fn new(
        incident_id: Uuid,
        name: impl Into<String>,
        description: impl Into<String>,
        steps: Vec<WorkflowStep>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            incident_id,
            name: name.into(),
            description: description.into(),
            steps,
            current_step_index: 0,
            status: WorkflowStatus::Pending,
            errors: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start(&mut self) {
        self.status = WorkflowStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Skip every step that was never dispatched and mark the run completed.
    pub fn complete(&mut self) {
        for step in &mut self.steps {
            if !step.status.is_terminal() {
                step.skip();
            }
        }
        self.current_step_index = self.steps.len();
        self.status = WorkflowStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Record a top-level fault.
    pub fn record_fault(&mut self, fault: impl Into<String>) {
        self.errors.push(fault.into());
    }

    /// True when no top-level fault occurred.
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_terminal(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }

    pub fn count_by_status(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    pub fn step_for_action(&self, action: ActionKind) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.action == action.as_str())
    }
}
