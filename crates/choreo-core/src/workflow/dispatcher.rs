//! Step dispatcher: runs one step against its handler and records the outcome.
//!
//! Per-step state machine: `pending -> running -> completed | failed | skipped`.
//! Every handler fault, including a panic, is caught here and turned into a
//! failed `ActionResult`. An unknown action identifier fails immediately
//! without reaching any collaborator.

use std::panic::AssertUnwindSafe;

use choreo_types::action::ActionResult;
use choreo_types::config::{DispatchConfig, FeatureFlags};
use choreo_types::incident::Incident;
use choreo_types::workflow::{ActionKind, StepStatus, WorkflowStep};
use futures_util::FutureExt;
use serde_json::Value;

use crate::collaborator::Collaborators;
use crate::error::{panic_message, RunFault};

use super::context::RunContext;
use super::handlers::ActionHandlers;

/// Executes steps one at a time with failure isolation.
pub struct StepDispatcher {
    handlers: ActionHandlers,
    dispatch: DispatchConfig,
}

impl StepDispatcher {
    pub fn new(collaborators: Collaborators, features: FeatureFlags, dispatch: DispatchConfig) -> Self {
        Self {
            handlers: ActionHandlers::new(collaborators, features, dispatch.clone()),
            dispatch,
        }
    }

    /// Dispatch `step`, then update the step, the incident whitelist and the
    /// context result map.
    ///
    /// Only a context overflow is returned as an error; every handler outcome
    /// is recorded on the step.
    pub async fn dispatch(&self, step: &mut WorkflowStep, ctx: &mut RunContext) -> Result<(), RunFault> {
        if step.status != StepStatus::Running {
            step.start();
        }
        tracing::debug!(
            run_id = %ctx.run_id,
            step = step.name.as_str(),
            action = step.action.as_str(),
            "dispatching step"
        );

        let result = match step.kind() {
            Some(kind) => self.invoke(kind, step, ctx).await,
            None => ActionResult::failed(
                step.action.as_str(),
                step.target.as_str(),
                format!("unknown action: '{}'", step.action),
            ),
        };

        self.log_outcome(step, ctx, &result);
        if let Some(kind) = step.kind() {
            apply_write_back(kind, &result, &mut ctx.incident);
        }
        let action = step.action.clone();
        step.finish(result.clone());
        ctx.record(&action, result)
    }

    async fn invoke(&self, kind: ActionKind, step: &WorkflowStep, ctx: &RunContext) -> ActionResult {
        let collaborator = kind.capability().as_str();
        match AssertUnwindSafe(self.handlers.run(kind, step, ctx))
            .catch_unwind()
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => ActionResult::failed(kind, collaborator, e.to_string()),
            Err(panic) => ActionResult::failed(
                kind,
                collaborator,
                format!("handler panicked: {}", panic_message(panic.as_ref())),
            ),
        }
    }

    fn log_outcome(&self, step: &WorkflowStep, ctx: &RunContext, result: &ActionResult) {
        let run_id = ctx.run_id;
        let error = result.error.as_deref().unwrap_or_default();
        if result.success {
            tracing::info!(
                %run_id,
                step = step.name.as_str(),
                action = step.action.as_str(),
                skipped = result.is_skipped(),
                "step completed"
            );
        } else if self.dispatch.is_critical(&step.action) {
            tracing::error!(
                %run_id,
                step = step.name.as_str(),
                action = step.action.as_str(),
                error,
                "critical step failed, continuing"
            );
        } else {
            tracing::warn!(
                %run_id,
                step = step.name.as_str(),
                action = step.action.as_str(),
                error,
                "step failed"
            );
        }
    }
}

/// Enumerated incident write-back. Only successful, non-skipped results of
/// these actions touch the incident.
pub fn apply_write_back(kind: ActionKind, result: &ActionResult, incident: &mut Incident) {
    if !result.success || result.is_skipped() {
        return;
    }
    let text = |key: &str| result.data_str(key).map(str::to_string);

    match kind {
        ActionKind::CreateTicket => {
            if let Some(id) = text("external_id") {
                incident.ticket_id = Some(id);
            }
        }
        ActionKind::CreateChannel => {
            if let Some(id) = text("channel_id") {
                incident.channel_id = Some(id);
            }
        }
        ActionKind::CreatePostmortem => {
            if let Some(id) = text("page_id") {
                incident.document_id = Some(id);
            }
        }
        ActionKind::GenerateHypothesis => {
            if let Some(h) = text("hypothesis") {
                incident.hypothesis = Some(h);
            }
        }
        ActionKind::CreateIssue => {
            if let Some(key) = text("issue_key") {
                incident.issue_key = Some(key);
            }
        }
        ActionKind::AssembleTeam => {
            let ids = result
                .data
                .as_ref()
                .and_then(|d| d.get("responder_ids"))
                .and_then(Value::as_array);
            if let Some(ids) = ids {
                incident.responder_ids.clear();
                for id in ids.iter().filter_map(Value::as_str) {
                    incident.add_responder(id);
                }
            }
        }
        ActionKind::UpdateTicket
        | ActionKind::NotifyTeam
        | ActionKind::AnalyzeCommits
        | ActionKind::GatherLogs
        | ActionKind::SearchKnowledge
        | ActionKind::PostUpdate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use choreo_types::collaborator::Capability;
    use choreo_types::incident::Severity;
    use choreo_types::workflow::{StepDescriptor, StepStatus};
    use serde_json::json;
    use uuid::Uuid;

    use crate::testing::{roster, MockWorld};

    fn dispatcher(world: &std::sync::Arc<MockWorld>) -> StepDispatcher {
        StepDispatcher::new(
            world.collaborators(),
            FeatureFlags::default(),
            DispatchConfig::default(),
        )
    }

    fn ctx() -> RunContext {
        RunContext::new(
            Uuid::now_v7(),
            Incident::new("Checkout down", "500s", Severity::Critical),
            roster(),
        )
    }

    fn step(action: &str) -> WorkflowStep {
        WorkflowStep::from_descriptor(StepDescriptor {
            name: format!("step {action}"),
            action: action.to_string(),
            target: "x".to_string(),
            parameters: Default::default(),
        })
    }

    #[tokio::test]
    async fn unknown_action_fails_fast_without_side_effects() {
        let world = MockWorld::new();
        let d = dispatcher(&world);
        let mut context = ctx();
        let mut s = step("launch_rockets");

        d.dispatch(&mut s, &mut context).await.unwrap();

        assert_eq!(s.status, StepStatus::Failed);
        assert!(s.error.as_deref().unwrap().contains("unknown action"));
        assert_eq!(world.total_calls(), 0);
        let recorded = &context.results()["launch_rockets"];
        assert!(!recorded.success);
    }

    #[tokio::test]
    async fn success_updates_step_incident_and_context() {
        let world = MockWorld::new();
        let d = dispatcher(&world);
        let mut context = ctx();
        let mut s = step("create_ticket");

        d.dispatch(&mut s, &mut context).await.unwrap();

        assert_eq!(s.status, StepStatus::Completed);
        assert!(s.started_at.is_some() && s.completed_at.is_some());
        assert!(context.incident.ticket_id.is_some());
        assert!(context.upstream_data(ActionKind::CreateTicket).is_some());
    }

    #[tokio::test]
    async fn collaborator_failure_is_recorded_not_raised() {
        let world = MockWorld::new();
        world.fail(Capability::Ticketing);
        let d = dispatcher(&world);
        let mut context = ctx();
        let mut s = step("create_ticket");

        d.dispatch(&mut s, &mut context).await.unwrap();

        assert_eq!(s.status, StepStatus::Failed);
        assert!(!s.error.as_deref().unwrap_or_default().is_empty());
        assert!(s.result.is_none());
        assert!(context.incident.ticket_id.is_none());
    }

    #[tokio::test]
    async fn handler_panic_is_contained() {
        let world = MockWorld::new();
        world.panic_on(Capability::Chat);
        let d = dispatcher(&world);
        let mut context = ctx();
        let mut s = step("create_channel");

        d.dispatch(&mut s, &mut context).await.unwrap();

        assert_eq!(s.status, StepStatus::Failed);
        assert!(s.error.as_deref().unwrap().contains("handler panicked"));
        assert!(context.incident.channel_id.is_none());
    }

    #[tokio::test]
    async fn skipped_result_marks_step_skipped() {
        let world = MockWorld::new();
        let d = StepDispatcher::new(
            world.collaborators(),
            FeatureFlags {
                documentation: false,
                ..FeatureFlags::default()
            },
            DispatchConfig::default(),
        );
        let mut context = ctx();
        let mut s = step("create_postmortem");

        d.dispatch(&mut s, &mut context).await.unwrap();

        assert_eq!(s.status, StepStatus::Skipped);
        assert!(s.status.is_terminal());
        assert!(context.incident.document_id.is_none());
        assert_eq!(world.calls(Capability::Documentation), 0);
    }

    #[test]
    fn write_back_ignores_failures_and_unlisted_actions() {
        let mut incident = Incident::new("t", "d", Severity::Low);
        apply_write_back(
            ActionKind::CreateTicket,
            &ActionResult::failed("create_ticket", "ticketing", "down"),
            &mut incident,
        );
        assert!(incident.ticket_id.is_none());

        apply_write_back(
            ActionKind::PostUpdate,
            &ActionResult::ok("post_update", "chat", "", json!({"channel_id": "C9"})),
            &mut incident,
        );
        assert!(incident.channel_id.is_none());
    }

    #[test]
    fn write_back_assemble_team_sets_responders() {
        let mut incident = Incident::new("t", "d", Severity::Low);
        apply_write_back(
            ActionKind::AssembleTeam,
            &ActionResult::ok(
                "assemble_team",
                "chat",
                "",
                json!({"assembled_count": 2, "responder_ids": ["u1", "u2"]}),
            ),
            &mut incident,
        );
        assert_eq!(incident.responder_ids, vec!["u1", "u2"]);
    }
}
