//! Fixed seven-stage incident playbook.
//!
//! Unlike the dynamic workflow, stages call collaborators directly instead of
//! going through the action dispatch table. Failure isolation is the same:
//! each stage's error or panic is caught and recorded in its
//! [`StageResult`], and later stages still run. The overall `success` flag
//! only turns false when a fault escapes the driving loop itself, or when
//! the configured deadline cuts the run short.

pub mod diagnostics;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::Utc;
use choreo_types::collaborator::UpdateKind;
use choreo_types::config::PlaybookConfig;
use choreo_types::error::CollaboratorError;
use choreo_types::incident::{Incident, IncidentStatus};
use choreo_types::playbook::{PlaybookResult, Stage, StageResult, StageStatus};
use choreo_types::team::TeamMember;
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::collaborator::Collaborators;
use crate::error::{panic_message, StageError};
use crate::workflow::selector::select_responders;

use self::diagnostics::{gather, recommendations, Diagnostics};

pub const PLAYBOOK_NAME: &str = "Incident Response Playbook";

const ALERT_DESCRIPTION_CHARS: usize = 500;
const ANALYSIS_EXCERPT_CHARS: usize = 500;
const MONITORING_NOTE: &str = "Incident workflow completed. Team assigned. Monitoring active.";

// ---------------------------------------------------------------------------
// Stage bookkeeping
// ---------------------------------------------------------------------------

/// What a stage body hands back before timestamps are attached.
struct StageOutcome {
    status: StageStatus,
    details: Map<String, Value>,
    error: Option<String>,
}

impl StageOutcome {
    fn failed(error: String) -> Self {
        Self {
            status: StageStatus::Failed,
            details: Map::new(),
            error: Some(error),
        }
    }
}

/// Tracks the optional sub-actions of a stage to derive its status.
#[derive(Default)]
struct SubActions {
    attempted: usize,
    errors: Vec<String>,
    details: Map<String, Value>,
}

impl SubActions {
    fn record<T>(&mut self, label: &str, result: Result<T, CollaboratorError>) -> Option<T> {
        self.attempted += 1;
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.errors.push(format!("{label}: {e}"));
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.details.insert(key.to_string(), value.into());
    }

    fn finish(self) -> StageOutcome {
        let status = if self.errors.is_empty() {
            StageStatus::Completed
        } else if self.errors.len() == self.attempted {
            StageStatus::Failed
        } else {
            StageStatus::Partial
        };
        StageOutcome {
            status,
            details: self.details,
            error: (!self.errors.is_empty()).then(|| self.errors.join("; ")),
        }
    }
}

/// State carried from one stage to the next.
#[derive(Default)]
struct PlaybookState {
    diagnostics: Diagnostics,
    issue_url: Option<String>,
    assigned_to: Option<String>,
}

fn to_map<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// ---------------------------------------------------------------------------
// IncidentPlaybook
// ---------------------------------------------------------------------------

/// Runs the seven stages in order against the injected collaborators.
pub struct IncidentPlaybook {
    collaborators: Collaborators,
    config: PlaybookConfig,
}

impl IncidentPlaybook {
    pub fn new(collaborators: Collaborators, config: PlaybookConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// Run every stage for `incident`, updating it in place.
    ///
    /// `repositories` overrides the configured repository list for the
    /// diagnostics stage.
    pub async fn run(
        &self,
        incident: &mut Incident,
        repositories: Option<&[String]>,
        roster: &[TeamMember],
    ) -> PlaybookResult {
        let mut result = PlaybookResult::new(incident.id, PLAYBOOK_NAME);
        tracing::info!(
            incident_id = %incident.id,
            severity = %incident.severity,
            "playbook started"
        );

        let repositories = repositories.unwrap_or(self.config.repositories.as_slice());
        let drive = AssertUnwindSafe(self.drive(incident, repositories, roster, &mut result.stages))
            .catch_unwind();
        let driven = match self.config.deadline_ms {
            Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), drive).await {
                Ok(outcome) => outcome.map_err(|panic| panic_message(panic.as_ref())),
                Err(_) => Err(format!("playbook exceeded its {ms} ms deadline")),
            },
            None => drive.await.map_err(|panic| panic_message(panic.as_ref())),
        };
        if let Err(message) = driven {
            tracing::error!(incident_id = %incident.id, error = message.as_str(), "playbook aborted");
            result.success = false;
            result.errors.push(message);
        }

        result.completed_at = Some(Utc::now());
        tracing::info!(
            incident_id = %incident.id,
            success = result.success,
            completed = result.stages.iter().filter(|s| s.is_completed()).count(),
            "playbook finished"
        );
        result
    }

    async fn drive(
        &self,
        incident: &mut Incident,
        repositories: &[String],
        roster: &[TeamMember],
        stages: &mut Vec<StageResult>,
    ) {
        let mut state = PlaybookState::default();
        for stage in Stage::ORDERED {
            let record = match stage {
                Stage::CreateTicket => run_stage(stage, self.create_ticket(incident)).await,
                Stage::AlertBroadcast => run_stage(stage, self.alert_broadcast(incident)).await,
                Stage::GatherDiagnostics => {
                    run_stage(stage, self.gather_diagnostics(incident, repositories, &mut state)).await
                }
                Stage::AnalyzeRootCause => {
                    run_stage(stage, self.analyze_root_cause(incident, &state)).await
                }
                Stage::CreateDocumentation => {
                    run_stage(stage, self.create_documentation(incident)).await
                }
                Stage::AssignAndNotify => {
                    run_stage(stage, self.assign_and_notify(incident, roster, &mut state)).await
                }
                Stage::ActivateMonitoring => {
                    run_stage(stage, self.activate_monitoring(incident, &state)).await
                }
            };
            stages.push(record);
        }
    }

    // -- 1. ticket --

    async fn create_ticket(&self, incident: &mut Incident) -> Result<StageOutcome, StageError> {
        let ticket = self.collaborators.ticketing.create(incident).await?;
        incident.ticket_id = Some(ticket.external_id.clone());

        let mut details = Map::new();
        details.insert("ticket_number".to_string(), json!(ticket.external_id));
        details.insert("ticket_link".to_string(), json!(ticket.link));
        details.insert(
            "classification".to_string(),
            json!({
                "severity": incident.severity.as_str(),
                "category": incident.category.as_str(),
                "priority": incident.severity.priority(),
            }),
        );
        Ok(StageOutcome {
            status: StageStatus::Completed,
            details,
            error: None,
        })
    }

    // -- 2. alert --

    async fn alert_broadcast(&self, incident: &mut Incident) -> Result<StageOutcome, StageError> {
        let chat = &self.collaborators.chat;
        let mut sub = SubActions::default();

        if let Some(channel) = sub.record("create channel", chat.create_channel(incident).await) {
            incident.channel_id = Some(channel.channel_id.clone());
            sub.set("incident_channel", channel.channel_name);
            sub.set("channel_link", channel.link);
        }

        let message = alert_message(incident);
        let alert_channel = self.config.alert_channel.as_str();
        if sub
            .record("alert", chat.notify(alert_channel, &message, Some(incident)).await)
            .is_some()
        {
            sub.set("alert_sent", true);
            sub.set("alert_channel", alert_channel);
        }
        Ok(sub.finish())
    }

    // -- 3. diagnostics --

    async fn gather_diagnostics(
        &self,
        incident: &Incident,
        repositories: &[String],
        state: &mut PlaybookState,
    ) -> Result<StageOutcome, StageError> {
        let diagnostics = gather(
            self.collaborators.code_host.as_ref(),
            incident,
            repositories,
            &self.config.deployment_environment,
        )
        .await;

        let status = if diagnostics.failures.is_empty() {
            StageStatus::Completed
        } else if diagnostics.all_failed() {
            StageStatus::Failed
        } else {
            StageStatus::Partial
        };
        let error = (!diagnostics.failures.is_empty()).then(|| diagnostics.failures.join("; "));
        let mut details = Map::new();
        details.insert("diagnostics".to_string(), Value::Object(to_map(&diagnostics)));

        state.diagnostics = diagnostics;
        Ok(StageOutcome {
            status,
            details,
            error,
        })
    }

    // -- 4. root cause --

    async fn analyze_root_cause(
        &self,
        incident: &mut Incident,
        state: &PlaybookState,
    ) -> Result<StageOutcome, StageError> {
        let commits: Vec<_> = state
            .diagnostics
            .commits()
            .take(diagnostics::MAX_COMMITS_PER_REPO)
            .collect();
        let input = choreo_types::collaborator::HypothesisInput {
            logs: None,
            changes: (!commits.is_empty()).then(|| json!(commits)),
            metrics: None,
        };
        let hypothesis = self
            .collaborators
            .decision
            .generate_hypothesis(incident, &input)
            .await?;
        incident.hypothesis = Some(hypothesis.clone());

        let mut sub = SubActions::default();
        sub.set("hypothesis", hypothesis.as_str());
        sub.set("recommendations", recommendations(incident, &state.diagnostics));
        sub.set("analyzed_commits", commits.len());

        if let Some(channel) = incident.channel_id.as_deref() {
            let details = format!(
                "Root Cause Analysis Complete\n\n{}",
                excerpt(&hypothesis, ANALYSIS_EXCERPT_CHARS)
            );
            sub.record(
                "post analysis",
                self.collaborators
                    .chat
                    .post_update(channel, incident, UpdateKind::AnalysisComplete, &details)
                    .await,
            );
        }
        Ok(sub.finish())
    }

    // -- 5. documentation --

    async fn create_documentation(&self, incident: &mut Incident) -> Result<StageOutcome, StageError> {
        let page = self
            .collaborators
            .documentation
            .create_postmortem(incident)
            .await?;
        incident.document_id = Some(page.page_id.clone());

        let mut sub = SubActions::default();
        if let Some(channel) = incident.channel_id.as_deref() {
            let details = format!("Incident page created: {}", page.url);
            sub.record(
                "post page link",
                self.collaborators
                    .chat
                    .post_update(channel, incident, UpdateKind::StatusChange, &details)
                    .await,
            );
        }
        sub.set("page_id", page.page_id);
        sub.set("page_url", page.url);
        sub.set("page_title", page.title);
        Ok(sub.finish())
    }

    // -- 6. assignment --

    async fn assign_and_notify(
        &self,
        incident: &mut Incident,
        roster: &[TeamMember],
        state: &mut PlaybookState,
    ) -> Result<StageOutcome, StageError> {
        let tracker = &self.collaborators.issue_tracker;
        let chat = &self.collaborators.chat;
        let team = select_responders(incident, roster);
        let mut sub = SubActions::default();

        if let Some(issue) = sub.record("create issue", tracker.create_issue(incident).await) {
            incident.issue_key = Some(issue.issue_key.clone());
            sub.set("issue_key", issue.issue_key.as_str());
            sub.set("issue_url", issue.url.as_str());
            state.issue_url = Some(issue.url);

            if let Some(assignee) = team.first() {
                let assigned = tracker.assign(&issue.issue_key, &assignee.email).await;
                if sub.record("assign issue", assigned).is_some() {
                    incident.add_responder(&assignee.id);
                    sub.set("assigned_to", assignee.name.as_str());
                    state.assigned_to = Some(assignee.name.clone());
                }
            }
        }

        if let Some(channel) = incident.channel_id.clone() {
            if !team.is_empty() {
                let members: Vec<TeamMember> = team.iter().map(|m| (*m).clone()).collect();
                let assembled = chat.assemble_team(incident, &members, &channel).await;
                if let Some(assembled) = sub.record("assemble team", assembled) {
                    for member in &members {
                        incident.add_responder(&member.id);
                    }
                    sub.set("team_assembled", assembled.assembled_count);
                }
            }

            let summary = assignment_summary(incident, state);
            sub.record(
                "post assignment",
                chat.post_update(&channel, incident, UpdateKind::TeamAssigned, &summary)
                    .await,
            );
        }
        Ok(sub.finish())
    }

    // -- 7. monitoring --

    async fn activate_monitoring(
        &self,
        incident: &mut Incident,
        state: &PlaybookState,
    ) -> Result<StageOutcome, StageError> {
        incident.status = IncidentStatus::InProgress;
        incident.acknowledged_at.get_or_insert_with(Utc::now);

        let mut sub = SubActions::default();
        if let Some(ticket_id) = incident.ticket_id.as_deref() {
            sub.record(
                "ticket note",
                self.collaborators
                    .ticketing
                    .add_note(ticket_id, MONITORING_NOTE)
                    .await,
            );
        }
        if let Some(channel) = incident.channel_id.as_deref() {
            let message = format!(
                "Monitoring Active\n\n- Incident status: {}\n- Response team assembled\n- All systems linked and tracking\n\nUpdates will be posted to this channel.",
                incident.status
            );
            sub.record(
                "monitoring broadcast",
                self.collaborators
                    .chat
                    .notify(channel, &message, Some(incident))
                    .await,
            );
        }

        sub.set("monitoring_active", true);
        sub.set("incident_status", incident.status.as_str());
        sub.set(
            "tracking",
            json!({
                "ticketing": incident.ticket_id.is_some(),
                "chat": incident.channel_id.is_some(),
                "documentation": incident.document_id.is_some(),
                "issue_tracker": state.issue_url.is_some(),
            }),
        );
        Ok(sub.finish())
    }
}

/// Run one stage body, converting its error or panic into a failed record.
async fn run_stage<F>(stage: Stage, body: F) -> StageResult
where
    F: Future<Output = Result<StageOutcome, StageError>>,
{
    let started_at = Utc::now();
    tracing::debug!(stage = %stage, number = stage.number(), "stage started");

    let outcome = match AssertUnwindSafe(body).catch_unwind().await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => StageOutcome::failed(e.to_string()),
        Err(panic) => StageOutcome::failed(StageError::Panicked(panic_message(panic.as_ref())).to_string()),
    };

    let error = outcome.error.as_deref().unwrap_or_default();
    match outcome.status {
        StageStatus::Completed => tracing::info!(stage = %stage, "stage completed"),
        StageStatus::Partial => tracing::warn!(stage = %stage, error, "stage partially completed"),
        StageStatus::Failed => tracing::warn!(stage = %stage, error, "stage failed"),
    }

    StageResult {
        stage,
        status: outcome.status,
        details: outcome.details,
        error: outcome.error,
        started_at,
        completed_at: Utc::now(),
    }
}

fn alert_message(incident: &Incident) -> String {
    let services = if incident.affected_services.is_empty() {
        "TBD".to_string()
    } else {
        incident.affected_services.join(", ")
    };
    let mut message = format!(
        "{} INCIDENT DETECTED\n\nTitle: {}\nCategory: {}\nAffected Services: {}\n\nDescription:\n{}\n\nTicket: {}",
        incident.severity.as_str().to_uppercase(),
        incident.title,
        incident.category,
        services,
        excerpt(&incident.description, ALERT_DESCRIPTION_CHARS),
        incident.ticket_id.as_deref().unwrap_or("pending"),
    );
    if let Some(channel) = &incident.channel_id {
        message.push_str(&format!("\nIncident Channel: {channel}"));
    }
    message
}

fn assignment_summary(incident: &Incident, state: &PlaybookState) -> String {
    format!(
        "Incident Assigned\n\nIssue: {}\nTicket: {}\nDocument: {}\nAssigned To: {}",
        state.issue_url.as_deref().unwrap_or("N/A"),
        incident.ticket_id.as_deref().unwrap_or("N/A"),
        incident.document_id.as_deref().unwrap_or("N/A"),
        state.assigned_to.as_deref().unwrap_or("Unassigned"),
    )
}
