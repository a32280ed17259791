//! Incident record: the mutable subject of every orchestration run.
//!
//! An `Incident` is created by an intake collaborator (alert webhook, manual
//! report) and handed to the engine. The engine never creates or destroys
//! incidents; it only fills in external references, responders, hypothesis
//! text and lifecycle timestamps as side effects of step execution.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Incident severity. Ordered so that `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities, most severe first.
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Whether this severity warrants immediate escalation (critical or high).
    pub fn is_urgent(&self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }

    /// Ticket priority label (P1 for critical through P4 for low).
    pub fn priority(&self) -> &'static str {
        match self {
            Severity::Critical => "P1",
            Severity::High => "P2",
            Severity::Medium => "P3",
            Severity::Low => "P4",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            other => Err(format!("unknown severity: '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Broad incident category, used for responder skill matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Infrastructure,
    Application,
    Database,
    Network,
    Security,
    Performance,
    Integration,
    #[default]
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Infrastructure => "infrastructure",
            Category::Application => "application",
            Category::Database => "database",
            Category::Network => "network",
            Category::Security => "security",
            Category::Performance => "performance",
            Category::Integration => "integration",
            Category::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "infrastructure" => Ok(Category::Infrastructure),
            "application" => Ok(Category::Application),
            "database" => Ok(Category::Database),
            "network" => Ok(Category::Network),
            "security" => Ok(Category::Security),
            "performance" => Ok(Category::Performance),
            "integration" => Ok(Category::Integration),
            "unknown" => Ok(Category::Unknown),
            other => Err(format!("unknown category: '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Incident lifecycle status.
///
/// Expected to move forward only (`Detected` -> ... -> `Closed`); the engine
/// does not enforce this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    #[default]
    Detected,
    Triaging,
    InProgress,
    Mitigated,
    Resolved,
    Closed,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Detected => "detected",
            IncidentStatus::Triaging => "triaging",
            IncidentStatus::InProgress => "in_progress",
            IncidentStatus::Mitigated => "mitigated",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Incident
// ---------------------------------------------------------------------------

/// A tracked unit of operational trouble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub status: IncidentStatus,

    /// Originating system (e.g. "datadog", "pagerduty", "manual").
    #[serde(default)]
    pub source_system: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_alert_id: Option<String>,

    #[serde(default)]
    pub affected_services: Vec<String>,
    #[serde(default)]
    pub affected_components: Vec<String>,

    // External references, written by step side effects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_key: Option<String>,

    #[serde(default)]
    pub responder_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hypothesis: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,

    pub detected_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mitigated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Incident {
    /// Create a freshly detected incident with no external references.
    pub fn new(title: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: Uuid::now_v7(),
            title: title.into(),
            description: description.into(),
            severity,
            category: Category::Unknown,
            status: IncidentStatus::Detected,
            source_system: String::new(),
            source_alert_id: None,
            affected_services: Vec::new(),
            affected_components: Vec::new(),
            ticket_id: None,
            channel_id: None,
            document_id: None,
            issue_key: None,
            responder_ids: Vec::new(),
            hypothesis: None,
            tags: Vec::new(),
            metadata: HashMap::new(),
            detected_at: Utc::now(),
            acknowledged_at: None,
            mitigated_at: None,
            resolved_at: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_affected_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_services = services.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_source(mut self, system: impl Into<String>, alert_id: Option<String>) -> Self {
        self.source_system = system.into();
        self.source_alert_id = alert_id;
        self
    }

    /// Record a responder, ignoring duplicates.
    pub fn add_responder(&mut self, member_id: &str) {
        if !self.responder_ids.iter().any(|id| id == member_id) {
            self.responder_ids.push(member_id.to_string());
        }
    }
}
