//! Result records for the fixed seven-stage incident playbook.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stages of the fixed playbook, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CreateTicket,
    AlertBroadcast,
    GatherDiagnostics,
    AnalyzeRootCause,
    CreateDocumentation,
    AssignAndNotify,
    ActivateMonitoring,
}

impl Stage {
    pub const ORDERED: [Stage; 7] = [
        Stage::CreateTicket,
        Stage::AlertBroadcast,
        Stage::GatherDiagnostics,
        Stage::AnalyzeRootCause,
        Stage::CreateDocumentation,
        Stage::AssignAndNotify,
        Stage::ActivateMonitoring,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CreateTicket => "create_ticket",
            Stage::AlertBroadcast => "alert_broadcast",
            Stage::GatherDiagnostics => "gather_diagnostics",
            Stage::AnalyzeRootCause => "analyze_root_cause",
            Stage::CreateDocumentation => "create_documentation",
            Stage::AssignAndNotify => "assign_and_notify",
            Stage::ActivateMonitoring => "activate_monitoring",
        }
    }

    /// Human-readable stage title.
    pub fn title(&self) -> &'static str {
        match self {
            Stage::CreateTicket => "Create Ticket",
            Stage::AlertBroadcast => "Send Alert",
            Stage::GatherDiagnostics => "Gather Diagnostic Information",
            Stage::AnalyzeRootCause => "Analyze Root Cause",
            Stage::CreateDocumentation => "Create Incident Page",
            Stage::AssignAndNotify => "Assign and Notify",
            Stage::ActivateMonitoring => "Monitor and Update",
        }
    }

    /// 1-based position in the playbook.
    pub fn number(&self) -> usize {
        Self::ORDERED
            .iter()
            .position(|s| s == self)
            .map(|i| i + 1)
            .unwrap_or(0)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    /// Some sub-actions failed, the rest succeeded.
    Partial,
    Failed,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Completed => "completed",
            StageStatus::Partial => "partial",
            StageStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-stage record accumulated into a [`PlaybookResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: Stage,
    pub status: StageStatus,
    /// Stage-specific output (ticket number, diagnostics, recommendations, ...).
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl StageResult {
    pub fn is_completed(&self) -> bool {
        self.status == StageStatus::Completed
    }
}

/// Overall record of one playbook run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookResult {
    pub incident_id: Uuid,
    pub workflow_name: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub stages: Vec<StageResult>,
    /// False only when a fault escaped the driving loop; stage failures do not
    /// flip it.
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl PlaybookResult {
    pub fn new(incident_id: Uuid, workflow_name: impl Into<String>) -> Self {
        Self {
            incident_id,
            workflow_name: workflow_name.into(),
            started_at: Utc::now(),
            completed_at: None,
            stages: Vec::with_capacity(Stage::ORDERED.len()),
            success: true,
            errors: Vec::new(),
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageResult> {
        self.stages.iter().find(|r| r.stage == stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_numbers_follow_order() {
        assert_eq!(Stage::CreateTicket.number(), 1);
        assert_eq!(Stage::GatherDiagnostics.number(), 3);
        assert_eq!(Stage::ActivateMonitoring.number(), 7);
    }

    #[test]
    fn new_result_is_successful_and_empty() {
        let r = PlaybookResult::new(Uuid::now_v7(), "Incident Response Playbook");
        assert!(r.success);
        assert!(r.stages.is_empty());
        assert!(r.stage(Stage::CreateTicket).is_none());
    }

    #[test]
    fn stage_status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&StageStatus::Partial).unwrap(), "\"partial\"");
        assert_eq!(serde_json::to_string(&Stage::AssignAndNotify).unwrap(), "\"assign_and_notify\"");
    }
}
