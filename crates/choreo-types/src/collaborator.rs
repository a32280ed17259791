//! Payloads exchanged with external collaborators.
//!
//! These are the typed forms of the `{success, ...fields}` responses the
//! engine consumes. A collaborator failure is a `CollaboratorError`, never a
//! payload with a false flag.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::incident::{Category, Severity};

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Identifier of an external collaborator capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Ticketing,
    Chat,
    CodeHost,
    Documentation,
    IssueTracker,
    Decision,
    Logging,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::Ticketing,
        Capability::Chat,
        Capability::CodeHost,
        Capability::Documentation,
        Capability::IssueTracker,
        Capability::Decision,
        Capability::Logging,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Ticketing => "ticketing",
            Capability::Chat => "chat",
            Capability::CodeHost => "code_host",
            Capability::Documentation => "documentation",
            Capability::IssueTracker => "issue_tracker",
            Capability::Decision => "decision",
            Capability::Logging => "logging",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown collaborator: '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Ticketing / chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketCreated {
    pub external_id: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelCreated {
    pub channel_id: String,
    pub channel_name: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAssembled {
    pub assembled_count: usize,
}

/// Kind of structured update posted to an incident channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    #[default]
    StatusChange,
    TeamAssigned,
    AnalysisComplete,
    MitigationStarted,
    Resolved,
    Escalation,
}

impl UpdateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateKind::StatusChange => "status_change",
            UpdateKind::TeamAssigned => "team_assigned",
            UpdateKind::AnalysisComplete => "analysis_complete",
            UpdateKind::MitigationStarted => "mitigation_started",
            UpdateKind::Resolved => "resolved",
            UpdateKind::Escalation => "escalation",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status_change" => Ok(UpdateKind::StatusChange),
            "team_assigned" => Ok(UpdateKind::TeamAssigned),
            "analysis_complete" => Ok(UpdateKind::AnalysisComplete),
            "mitigation_started" => Ok(UpdateKind::MitigationStarted),
            "resolved" => Ok(UpdateKind::Resolved),
            "escalation" => Ok(UpdateKind::Escalation),
            other => Err(format!("unknown update type: '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Code host
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub committed_at: DateTime<Utc>,
    #[serde(default)]
    pub files_changed: Vec<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub repository: String,
    pub total: usize,
    pub commits: Vec<Commit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub environment: String,
    pub reference: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRun {
    pub id: String,
    pub name: String,
    pub status: String,
    pub branch: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Documentation / issue tracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageCreated {
    pub page_id: String,
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeArticle {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueCreated {
    pub issue_key: String,
    pub url: String,
}

// ---------------------------------------------------------------------------
// Decision service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub severity: Severity,
    pub category: Category,
    pub confidence: f32,
    pub reasoning: String,
    #[serde(default)]
    pub affected_systems: Vec<String>,
}

/// Optional evidence handed to hypothesis generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HypothesisInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_identifiers() {
        assert_eq!(Capability::CodeHost.as_str(), "code_host");
        assert_eq!("issue_tracker".parse::<Capability>().unwrap(), Capability::IssueTracker);
        assert!("pager".parse::<Capability>().is_err());
    }

    #[test]
    fn update_kind_parse() {
        assert_eq!("analysis_complete".parse::<UpdateKind>().unwrap(), UpdateKind::AnalysisComplete);
        assert_eq!(UpdateKind::default(), UpdateKind::StatusChange);
        assert!("celebration".parse::<UpdateKind>().is_err());
    }
}
