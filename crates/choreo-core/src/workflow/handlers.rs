//! Action handlers: one per [`ActionKind`], dispatched by exhaustive match.
//!
//! Handlers read the incident, roster and upstream results from the
//! [`RunContext`] but never mutate it; the dispatcher applies the enumerated
//! incident write-back after the handler returns.

use choreo_types::action::ActionResult;
use choreo_types::collaborator::{HypothesisInput, UpdateKind};
use choreo_types::config::{DispatchConfig, FeatureFlags};
use choreo_types::error::CollaboratorError;
use choreo_types::team::TeamMember;
use choreo_types::workflow::{ActionKind, WorkflowStep};
use serde::Serialize;
use serde_json::{json, Value};

use crate::collaborator::Collaborators;
use crate::error::HandlerError;

use super::context::RunContext;
use super::selector::select_responders;

/// Log sources queued when a step does not name its own.
pub const DEFAULT_LOG_SOURCES: [&str; 2] = ["application", "infrastructure"];

const DEFAULT_TICKET_NOTE: &str = "Automated update from the incident workflow";
const DEFAULT_UPDATE_DETAILS: &str = "Workflow step completed";

type HandlerResult = Result<ActionResult, HandlerError>;

/// The fixed action-to-handler mapping.
pub struct ActionHandlers {
    collaborators: Collaborators,
    features: FeatureFlags,
    dispatch: DispatchConfig,
}

impl ActionHandlers {
    pub fn new(collaborators: Collaborators, features: FeatureFlags, dispatch: DispatchConfig) -> Self {
        Self {
            collaborators,
            features,
            dispatch,
        }
    }

    /// Run the handler for `kind`. Disabled capabilities short-circuit to a
    /// skipped result without touching the collaborator.
    pub async fn run(&self, kind: ActionKind, step: &WorkflowStep, ctx: &RunContext) -> HandlerResult {
        let capability = kind.capability();
        if !self.features.is_enabled(capability) {
            return Ok(ActionResult::skipped(
                kind,
                capability.as_str(),
                format!("{capability} disabled"),
            ));
        }

        match kind {
            ActionKind::CreateTicket => self.create_ticket(ctx).await,
            ActionKind::UpdateTicket => self.update_ticket(step, ctx).await,
            ActionKind::CreateChannel => self.create_channel(ctx).await,
            ActionKind::NotifyTeam => self.notify_team(step, ctx).await,
            ActionKind::AssembleTeam => self.assemble_team(ctx).await,
            ActionKind::AnalyzeCommits => self.analyze_commits(step, ctx).await,
            ActionKind::GatherLogs => Ok(gather_logs(step, ctx)),
            ActionKind::CreatePostmortem => self.create_postmortem(ctx).await,
            ActionKind::GenerateHypothesis => self.generate_hypothesis(ctx).await,
            ActionKind::SearchKnowledge => self.search_knowledge(ctx).await,
            ActionKind::PostUpdate => self.post_update(step, ctx).await,
            ActionKind::CreateIssue => self.create_issue(ctx).await,
        }
    }

    // -- ticketing --

    async fn create_ticket(&self, ctx: &RunContext) -> HandlerResult {
        let ticket = self.collaborators.ticketing.create(&ctx.incident).await?;
        Ok(ActionResult::ok(
            ActionKind::CreateTicket,
            "ticketing",
            format!("Created ticket {}", ticket.external_id),
            to_data(&ticket)?,
        ))
    }

    async fn update_ticket(&self, step: &WorkflowStep, ctx: &RunContext) -> HandlerResult {
        let ticket_id = ctx
            .incident
            .ticket_id
            .as_deref()
            .ok_or_else(|| HandlerError::MissingInput("no ticket id available".to_string()))?;
        let note = param_str(step, "note")
            .or_else(|| {
                step.parameters
                    .get("updates")
                    .and_then(|u| u.get("note"))
                    .and_then(Value::as_str)
            })
            .unwrap_or(DEFAULT_TICKET_NOTE);

        self.collaborators.ticketing.add_note(ticket_id, note).await?;
        Ok(ActionResult::ok(
            ActionKind::UpdateTicket,
            "ticketing",
            "Ticket updated",
            json!({ "ticket_id": ticket_id, "note": note }),
        ))
    }

    // -- chat --

    async fn create_channel(&self, ctx: &RunContext) -> HandlerResult {
        let channel = self.collaborators.chat.create_channel(&ctx.incident).await?;
        Ok(ActionResult::ok(
            ActionKind::CreateChannel,
            "chat",
            format!("Created channel {}", channel.channel_name),
            to_data(&channel)?,
        ))
    }

    async fn notify_team(&self, step: &WorkflowStep, ctx: &RunContext) -> HandlerResult {
        let incident = &ctx.incident;
        let channel = incident
            .channel_id
            .as_deref()
            .or_else(|| param_str(step, "channel"))
            .ok_or_else(|| {
                HandlerError::MissingInput("no channel available for notification".to_string())
            })?;
        let message = match param_str(step, "message") {
            Some(m) => m.to_string(),
            None => format!(
                "{} INCIDENT DETECTED\n\n{}\n\nTeam members have been notified. Please acknowledge.",
                incident.severity.as_str().to_uppercase(),
                incident.title
            ),
        };

        self.collaborators
            .chat
            .notify(channel, &message, Some(incident))
            .await?;
        Ok(ActionResult::ok(
            ActionKind::NotifyTeam,
            "chat",
            "Team notified",
            json!({ "channel": channel, "urgency": step.parameters.get("urgency") }),
        ))
    }

    async fn assemble_team(&self, ctx: &RunContext) -> HandlerResult {
        if ctx.roster.is_empty() {
            return Err(HandlerError::MissingInput(
                "no team members available".to_string(),
            ));
        }
        let channel = ctx.incident.channel_id.as_deref().ok_or_else(|| {
            HandlerError::MissingInput("no incident channel available, create channel first".to_string())
        })?;

        let members: Vec<TeamMember> = select_responders(&ctx.incident, &ctx.roster)
            .into_iter()
            .cloned()
            .collect();
        let assembled = self
            .collaborators
            .chat
            .assemble_team(&ctx.incident, &members, channel)
            .await?;
        let responder_ids: Vec<&str> = members.iter().map(|m| m.id.as_str()).collect();

        Ok(ActionResult::ok(
            ActionKind::AssembleTeam,
            "chat",
            format!("Assembled {} team members", assembled.assembled_count),
            json!({
                "assembled_count": assembled.assembled_count,
                "responder_ids": responder_ids,
            }),
        ))
    }

    async fn post_update(&self, step: &WorkflowStep, ctx: &RunContext) -> HandlerResult {
        let channel = ctx
            .incident
            .channel_id
            .as_deref()
            .ok_or_else(|| HandlerError::MissingInput("no channel available".to_string()))?;
        let kind = match param_str(step, "update_type") {
            Some(raw) => raw
                .parse::<UpdateKind>()
                .map_err(|reason| HandlerError::InvalidParameter {
                    name: "update_type".to_string(),
                    reason,
                })?,
            None => UpdateKind::default(),
        };
        let details = param_str(step, "details").unwrap_or(DEFAULT_UPDATE_DETAILS);

        self.collaborators
            .chat
            .post_update(channel, &ctx.incident, kind, details)
            .await?;
        Ok(ActionResult::ok(
            ActionKind::PostUpdate,
            "chat",
            "Update posted",
            json!({ "channel": channel, "update_type": kind.as_str() }),
        ))
    }

    // -- code host --

    async fn analyze_commits(&self, step: &WorkflowStep, ctx: &RunContext) -> HandlerResult {
        let repo = param_str(step, "repo").unwrap_or(self.dispatch.default_repository.as_str());
        let hours_back = match step.parameters.get("hours_back") {
            None => self.dispatch.default_hours_back,
            Some(value) => parse_hours(value).ok_or_else(|| HandlerError::InvalidParameter {
                name: "hours_back".to_string(),
                reason: format!("expected a non-negative integer, got {value}"),
            })?,
        };

        let summary = self
            .collaborators
            .code_host
            .recent_changes(repo, hours_back, &ctx.incident.affected_services)
            .await?;
        Ok(ActionResult::ok(
            ActionKind::AnalyzeCommits,
            "code_host",
            format!("Analyzed {} commits", summary.total),
            to_data(&summary)?,
        ))
    }

    // -- documentation --

    async fn create_postmortem(&self, ctx: &RunContext) -> HandlerResult {
        let page = self
            .collaborators
            .documentation
            .create_postmortem(&ctx.incident)
            .await?;
        Ok(ActionResult::ok(
            ActionKind::CreatePostmortem,
            "documentation",
            format!("Created post-mortem: {}", page.title),
            to_data(&page)?,
        ))
    }

    async fn search_knowledge(&self, ctx: &RunContext) -> HandlerResult {
        let query = knowledge_query(ctx);
        let articles = self.collaborators.documentation.search(&query).await?;
        Ok(ActionResult::ok(
            ActionKind::SearchKnowledge,
            "documentation",
            format!("Found {} relevant articles", articles.len()),
            json!({
                "query": query,
                "total": articles.len(),
                "results": to_data(&articles)?,
            }),
        ))
    }

    // -- decision service --

    async fn generate_hypothesis(&self, ctx: &RunContext) -> HandlerResult {
        let input = HypothesisInput {
            logs: ctx.upstream_data(ActionKind::GatherLogs).cloned(),
            changes: ctx
                .upstream_data(ActionKind::AnalyzeCommits)
                .and_then(|d| d.get("commits"))
                .cloned(),
            metrics: None,
        };
        let hypothesis = self
            .collaborators
            .decision
            .generate_hypothesis(&ctx.incident, &input)
            .await?;
        Ok(ActionResult::ok(
            ActionKind::GenerateHypothesis,
            "decision",
            "Generated root cause hypothesis",
            json!({
                "hypothesis": hypothesis,
                "used_logs": input.logs.is_some(),
                "used_changes": input.changes.is_some(),
            }),
        ))
    }

    // -- issue tracker --

    async fn create_issue(&self, ctx: &RunContext) -> HandlerResult {
        let tracker = &self.collaborators.issue_tracker;
        let issue = tracker.create_issue(&ctx.incident).await?;

        let mut assigned_to = None;
        let mut assignment_error = None;
        if let Some(assignee) = select_responders(&ctx.incident, &ctx.roster).first() {
            match tracker.assign(&issue.issue_key, &assignee.email).await {
                Ok(()) => assigned_to = Some(assignee.name.clone()),
                Err(e) => {
                    tracing::warn!(
                        issue_key = issue.issue_key.as_str(),
                        error = %e,
                        "issue created but assignment failed"
                    );
                    assignment_error = Some(e.to_string());
                }
            }
        }

        Ok(ActionResult::ok(
            ActionKind::CreateIssue,
            "issue_tracker",
            format!("Created issue {}", issue.issue_key),
            json!({
                "issue_key": issue.issue_key,
                "url": issue.url,
                "assigned_to": assigned_to,
                "assignment_error": assignment_error,
            }),
        ))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Log gathering has no collaborator: it reports which sources are queued.
fn gather_logs(step: &WorkflowStep, ctx: &RunContext) -> ActionResult {
    let sources: Vec<String> = match step.parameters.get("sources").and_then(Value::as_array) {
        Some(list) => list
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        None => DEFAULT_LOG_SOURCES.iter().map(|s| s.to_string()).collect(),
    };
    ActionResult::ok(
        ActionKind::GatherLogs,
        "logging",
        "Log gathering initiated",
        json!({
            "sources": sources,
            "services": ctx.incident.affected_services,
            "status": "collecting",
        }),
    )
}

/// `"<category> <first two affected services>"`.
pub(crate) fn knowledge_query(ctx: &RunContext) -> String {
    let services: Vec<&str> = ctx
        .incident
        .affected_services
        .iter()
        .take(2)
        .map(String::as_str)
        .collect();
    format!("{} {}", ctx.incident.category, services.join(" "))
        .trim()
        .to_string()
}

fn param_str<'s>(step: &'s WorkflowStep, key: &str) -> Option<&'s str> {
    step.parameters.get(key).and_then(Value::as_str)
}

fn parse_hours(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|h| u32::try_from(h).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_data<T: Serialize>(payload: &T) -> Result<Value, HandlerError> {
    serde_json::to_value(payload)
        .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use choreo_types::collaborator::Capability;
    use choreo_types::incident::{Category, Incident, Severity};
    use choreo_types::workflow::StepDescriptor;
    use uuid::Uuid;

    use crate::testing::{roster, MockWorld};

    fn handlers(world: &std::sync::Arc<MockWorld>, features: FeatureFlags) -> ActionHandlers {
        ActionHandlers::new(world.collaborators(), features, DispatchConfig::default())
    }

    fn step(kind: ActionKind) -> WorkflowStep {
        WorkflowStep::from_descriptor(StepDescriptor::new("s", kind, "x"))
    }

    fn ctx(incident: Incident) -> RunContext {
        RunContext::new(Uuid::now_v7(), incident, roster())
    }

    fn incident() -> Incident {
        Incident::new("DB down", "primary unreachable", Severity::Critical)
            .with_category(Category::Database)
            .with_affected_services(["orders-db", "orders-api", "billing"])
    }

    #[tokio::test]
    async fn disabled_capability_is_skipped_without_calls() {
        let world = MockWorld::new();
        let h = handlers(
            &world,
            FeatureFlags {
                auto_ticketing: false,
                ..FeatureFlags::default()
            },
        );
        let result = h
            .run(ActionKind::CreateTicket, &step(ActionKind::CreateTicket), &ctx(incident()))
            .await
            .unwrap();
        assert!(result.is_skipped());
        assert_eq!(world.calls(Capability::Ticketing), 0);
    }

    #[tokio::test]
    async fn update_ticket_requires_ticket_id() {
        let world = MockWorld::new();
        let h = handlers(&world, FeatureFlags::default());
        let err = h
            .run(ActionKind::UpdateTicket, &step(ActionKind::UpdateTicket), &ctx(incident()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no ticket id available");
        assert_eq!(world.calls(Capability::Ticketing), 0);
    }

    #[tokio::test]
    async fn notify_team_falls_back_to_channel_parameter() {
        let world = MockWorld::new();
        let h = handlers(&world, FeatureFlags::default());
        let mut s = step(ActionKind::NotifyTeam);
        s.parameters.insert("channel".to_string(), json!("#ops"));

        let result = h.run(ActionKind::NotifyTeam, &s, &ctx(incident())).await.unwrap();
        assert_eq!(result.data_str("channel"), Some("#ops"));

        let err = h
            .run(ActionKind::NotifyTeam, &step(ActionKind::NotifyTeam), &ctx(incident()))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::MissingInput(_)));
    }

    #[tokio::test]
    async fn assemble_team_reports_selected_responders() {
        let world = MockWorld::new();
        let h = handlers(&world, FeatureFlags::default());
        let mut inc = incident();
        inc.channel_id = Some("C1".to_string());

        let result = h
            .run(ActionKind::AssembleTeam, &step(ActionKind::AssembleTeam), &ctx(inc))
            .await
            .unwrap();
        let ids = result.data.as_ref().unwrap()["responder_ids"].as_array().unwrap();
        assert!(!ids.is_empty() && ids.len() <= 5);
    }

    #[tokio::test]
    async fn assemble_team_rejects_empty_roster() {
        let world = MockWorld::new();
        let h = handlers(&world, FeatureFlags::default());
        let mut inc = incident();
        inc.channel_id = Some("C1".to_string());
        let context = RunContext::new(Uuid::now_v7(), inc, Vec::new());

        let err = h
            .run(ActionKind::AssembleTeam, &step(ActionKind::AssembleTeam), &context)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no team members available");
        assert_eq!(world.calls(Capability::Chat), 0);
    }

    #[tokio::test]
    async fn analyze_commits_uses_defaults_and_validates_hours() {
        let world = MockWorld::new();
        let h = handlers(&world, FeatureFlags::default());

        let result = h
            .run(ActionKind::AnalyzeCommits, &step(ActionKind::AnalyzeCommits), &ctx(incident()))
            .await
            .unwrap();
        assert_eq!(result.data_str("repository"), Some("acme/main-app"));

        let mut s = step(ActionKind::AnalyzeCommits);
        s.parameters.insert("hours_back".to_string(), json!("a while"));
        let err = h.run(ActionKind::AnalyzeCommits, &s, &ctx(incident())).await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidParameter { .. }));
    }

    #[tokio::test]
    async fn gather_logs_needs_no_collaborator() {
        let world = MockWorld::new();
        let h = handlers(&world, FeatureFlags::default());
        let result = h
            .run(ActionKind::GatherLogs, &step(ActionKind::GatherLogs), &ctx(incident()))
            .await
            .unwrap();
        assert_eq!(result.data.as_ref().unwrap()["sources"], json!(DEFAULT_LOG_SOURCES));
        assert_eq!(world.total_calls(), 0);
    }

    #[tokio::test]
    async fn hypothesis_tolerates_missing_upstream_results() {
        let world = MockWorld::new();
        let h = handlers(&world, FeatureFlags::default());
        let mut context = ctx(incident());

        let result = h
            .run(ActionKind::GenerateHypothesis, &step(ActionKind::GenerateHypothesis), &context)
            .await
            .unwrap();
        assert_eq!(result.data.as_ref().unwrap()["used_changes"], json!(false));

        context
            .record(
                "analyze_commits",
                ActionResult::ok("analyze_commits", "code_host", "", json!({"commits": [{"sha": "abc"}]})),
            )
            .unwrap();
        let result = h
            .run(ActionKind::GenerateHypothesis, &step(ActionKind::GenerateHypothesis), &context)
            .await
            .unwrap();
        assert_eq!(result.data.as_ref().unwrap()["used_changes"], json!(true));
        assert!(result.data_str("hypothesis").is_some());
    }

    #[test]
    fn knowledge_query_uses_first_two_services() {
        let context = ctx(incident());
        assert_eq!(knowledge_query(&context), "database orders-db orders-api");

        let bare = ctx(Incident::new("t", "d", Severity::Low));
        assert_eq!(knowledge_query(&bare), "unknown");
    }

    #[tokio::test]
    async fn post_update_rejects_unknown_update_type() {
        let world = MockWorld::new();
        let h = handlers(&world, FeatureFlags::default());
        let mut inc = incident();
        inc.channel_id = Some("C1".to_string());
        let mut s = step(ActionKind::PostUpdate);
        s.parameters.insert("update_type".to_string(), json!("party"));

        let err = h.run(ActionKind::PostUpdate, &s, &ctx(inc)).await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidParameter { .. }));
    }

    #[tokio::test]
    async fn create_issue_assigns_first_responder() {
        let world = MockWorld::new();
        let h = handlers(&world, FeatureFlags::default());
        let result = h
            .run(ActionKind::CreateIssue, &step(ActionKind::CreateIssue), &ctx(incident()))
            .await
            .unwrap();
        assert!(result.data_str("issue_key").is_some());
        assert!(result.data_str("assigned_to").is_some());
        assert_eq!(world.calls(Capability::IssueTracker), 2);
    }
}
