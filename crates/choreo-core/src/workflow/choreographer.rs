//! Choreographer: plans, registers and runs one dynamic workflow per incident.
//!
//! # Run flow
//!
//! 1. Ask the [`WorkflowBuilder`] for a plan (recommended or fallback).
//! 2. Register the pending workflow, then mark it running.
//! 3. Dispatch each step in order through the [`StepDispatcher`], upserting
//!    the registry snapshot when a step starts and when it finishes.
//! 4. A top-level fault (context overflow, panic outside a handler) is
//!    appended to `workflow.errors` and aborts the remaining steps.
//! 5. The workflow always ends `completed`; undispatched steps are `skipped`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use choreo_types::config::{ChoreoConfig, DispatchConfig, FeatureFlags};
use choreo_types::incident::Incident;
use choreo_types::team::TeamMember;
use choreo_types::workflow::{StepStatus, Workflow};
use futures_util::FutureExt;
use uuid::Uuid;

use crate::collaborator::Collaborators;
use crate::error::{panic_message, RunFault};

use super::builder::{available_collaborators, PlanSource, WorkflowBuilder};
use super::context::RunContext;
use super::dispatcher::StepDispatcher;
use super::registry::WorkflowRegistry;

/// Longest incident title carried into a workflow name.
const MAX_NAME_TITLE_CHARS: usize = 50;

/// Everything a caller gets back from one run.
#[derive(Debug, Clone)]
pub struct OrchestrationOutcome {
    pub workflow: Workflow,
    /// The incident after all write-backs.
    pub incident: Incident,
    pub plan_source: PlanSource,
}

/// Entry point for dynamic workflows.
///
/// Cheap to share behind an `Arc`; concurrent runs only meet in the
/// registry, where each run writes its own entry.
pub struct Choreographer {
    builder: WorkflowBuilder,
    dispatcher: StepDispatcher,
    registry: Arc<WorkflowRegistry>,
    features: FeatureFlags,
    dispatch: DispatchConfig,
}

impl Choreographer {
    pub fn new(collaborators: Collaborators, config: &ChoreoConfig) -> Self {
        Self {
            builder: WorkflowBuilder::new(collaborators.decision.clone()),
            dispatcher: StepDispatcher::new(
                collaborators,
                config.features.clone(),
                config.dispatch.clone(),
            ),
            registry: Arc::new(WorkflowRegistry::new(config.registry.clone())),
            features: config.features.clone(),
            dispatch: config.dispatch.clone(),
        }
    }

    /// Plan and run a workflow for `incident`. Never fails: step failures and
    /// top-level faults are recorded on the returned workflow.
    pub async fn orchestrate(&self, incident: Incident, roster: Vec<TeamMember>) -> OrchestrationOutcome {
        let available = available_collaborators(&self.features);
        let plan = self.builder.build(&incident, &available).await;
        let plan_source = plan.source;

        let mut workflow = Workflow::new(
            incident.id,
            workflow_name(&incident),
            format!("Automated response workflow for {} incident", incident.severity),
            plan.into_steps(),
        );
        self.registry.register(&workflow);
        workflow.start();
        self.registry.update(&workflow);

        tracing::info!(
            workflow_id = %workflow.id,
            incident_id = %incident.id,
            severity = %incident.severity,
            steps = workflow.steps.len(),
            plan = plan_source.as_str(),
            "workflow started"
        );

        let mut ctx = RunContext::new(workflow.id, incident, roster)
            .with_limits(self.dispatch.max_result_bytes, self.dispatch.max_context_bytes);
        self.run_steps(&mut workflow, &mut ctx).await;

        workflow.complete();
        self.registry.update(&workflow);

        tracing::info!(
            workflow_id = %workflow.id,
            completed = workflow.count_by_status(StepStatus::Completed),
            failed = workflow.count_by_status(StepStatus::Failed),
            skipped = workflow.count_by_status(StepStatus::Skipped),
            faults = workflow.errors.len(),
            "workflow completed"
        );

        OrchestrationOutcome {
            workflow,
            incident: ctx.into_incident(),
            plan_source,
        }
    }

    async fn run_steps(&self, workflow: &mut Workflow, ctx: &mut RunContext) {
        for index in 0..workflow.steps.len() {
            workflow.current_step_index = index;
            workflow.steps[index].start();
            self.registry.update(workflow);

            let step = &mut workflow.steps[index];
            let outcome = AssertUnwindSafe(self.dispatcher.dispatch(step, ctx))
                .catch_unwind()
                .await;

            let fault = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(fault)) => Some(fault),
                Err(panic) => Some(RunFault::Panicked(panic_message(panic.as_ref()))),
            };

            if let Some(fault) = fault {
                tracing::error!(
                    workflow_id = %workflow.id,
                    step = workflow.steps[index].name.as_str(),
                    error = %fault,
                    "workflow aborted"
                );
                abort_run(workflow, index, &fault);
                self.registry.update(workflow);
                return;
            }
            self.registry.update(workflow);
        }
    }

    /// Latest snapshot of a workflow, running or finished.
    pub fn workflow_status(&self, workflow_id: Uuid) -> Option<Workflow> {
        self.registry.get(workflow_id)
    }

    pub fn list_workflows(&self) -> Vec<Workflow> {
        self.registry.list()
    }

    pub fn registry(&self) -> &Arc<WorkflowRegistry> {
        &self.registry
    }
}

fn workflow_name(incident: &Incident) -> String {
    let title: String = incident.title.chars().take(MAX_NAME_TITLE_CHARS).collect();
    format!("Incident Response: {title}")
}

/// Record a top-level fault at step `index`. The step is failed if it was
/// left running; later steps are skipped by `Workflow::complete`.
fn abort_run(workflow: &mut Workflow, index: usize, fault: &RunFault) {
    if let Some(step) = workflow.steps.get_mut(index) {
        if step.status == StepStatus::Running {
            step.fail(fault.to_string());
        }
    }
    workflow.record_fault(fault.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use choreo_types::collaborator::Capability;
    use choreo_types::incident::Severity;
    use choreo_types::workflow::{ActionKind, RawStepDescriptor, WorkflowStatus, WorkflowStep};

    use crate::testing::{roster, MockWorld};
    use crate::workflow::builder::fallback_plan;

    fn choreographer(world: &Arc<MockWorld>) -> Choreographer {
        Choreographer::new(world.collaborators(), &ChoreoConfig::default())
    }

    fn critical() -> Incident {
        Incident::new("Checkout API returning 500s", "error rate above 40%", Severity::Critical)
            .with_affected_services(["checkout-api"])
    }

    fn raw(action: &str) -> RawStepDescriptor {
        RawStepDescriptor {
            name: Some(format!("Run {action}")),
            action: Some(action.to_string()),
            target: None,
            parameters: None,
        }
    }

    fn actions(workflow: &Workflow) -> Vec<&str> {
        workflow.steps.iter().map(|s| s.action.as_str()).collect()
    }

    #[tokio::test]
    async fn critical_incident_all_collaborators_succeed() {
        let world = MockWorld::new();
        let outcome = choreographer(&world).orchestrate(critical(), roster()).await;

        let wf = &outcome.workflow;
        assert_eq!(wf.status, WorkflowStatus::Completed);
        assert!(wf.succeeded());
        assert_eq!(wf.steps.len(), 5);
        assert!(wf.steps.iter().all(|s| s.status == StepStatus::Completed));
        assert!(outcome.incident.ticket_id.is_some());
        assert!(outcome.incident.channel_id.is_some());
        assert!(outcome.incident.document_id.is_some());
        assert_eq!(wf.current_step_index, wf.steps.len());
    }

    #[tokio::test]
    async fn ticket_failure_does_not_stop_later_steps() {
        let world = MockWorld::new();
        world.fail(Capability::Ticketing);
        let outcome = choreographer(&world).orchestrate(critical(), roster()).await;

        let wf = &outcome.workflow;
        assert_eq!(wf.status, WorkflowStatus::Completed);
        assert!(wf.succeeded());

        let ticket = wf.step_for_action(ActionKind::CreateTicket).unwrap();
        assert_eq!(ticket.status, StepStatus::Failed);
        assert!(!ticket.error.as_deref().unwrap_or_default().is_empty());
        assert!(outcome.incident.ticket_id.is_none());

        for kind in [ActionKind::CreateChannel, ActionKind::NotifyTeam, ActionKind::CreatePostmortem] {
            assert_eq!(wf.step_for_action(kind).unwrap().status, StepStatus::Completed);
        }
        assert!(outcome.incident.channel_id.is_some());
        assert!(outcome.incident.document_id.is_some());
    }

    #[tokio::test]
    async fn decision_failure_runs_the_fallback_plan() {
        let world = MockWorld::new();
        world.fail(Capability::Decision);
        let c = choreographer(&world);

        for severity in Severity::ALL {
            let outcome = c
                .orchestrate(Incident::new("t", "d", severity), roster())
                .await;
            assert_eq!(outcome.plan_source, PlanSource::Fallback);
            let expected: Vec<String> = fallback_plan(severity).into_iter().map(|s| s.action).collect();
            assert_eq!(actions(&outcome.workflow), expected);
        }
    }

    #[tokio::test]
    async fn recommended_plan_with_unknown_action() {
        let world = MockWorld::new();
        world.set_plan(vec![raw("create_channel"), raw("launch_rockets"), raw("notify_team")]);
        let outcome = choreographer(&world).orchestrate(critical(), roster()).await;

        assert_eq!(outcome.plan_source, PlanSource::Recommended);
        let wf = &outcome.workflow;
        assert_eq!(wf.steps[0].status, StepStatus::Completed);
        assert_eq!(wf.steps[1].status, StepStatus::Failed);
        assert!(wf.steps[1].error.as_deref().unwrap().contains("launch_rockets"));
        assert_eq!(wf.steps[2].status, StepStatus::Completed);
        // One plan request plus the two known chat steps.
        assert_eq!(world.total_calls(), 3);
    }

    #[tokio::test]
    async fn every_step_ends_terminal_under_mixed_outcomes() {
        let world = MockWorld::new();
        world.fail(Capability::Chat);
        world.fail_method("doc_search");
        world.set_plan(
            ActionKind::ALL
                .iter()
                .map(|k| raw(k.as_str()))
                .chain([raw("unknown"), RawStepDescriptor::default()])
                .collect(),
        );
        let outcome = choreographer(&world).orchestrate(critical(), roster()).await;

        let wf = &outcome.workflow;
        assert_eq!(wf.steps.len(), ActionKind::ALL.len() + 2);
        assert!(wf.steps.iter().all(|s| s.status.is_terminal()));
        assert!(wf.count_by_status(StepStatus::Failed) > 0);
        assert!(wf.count_by_status(StepStatus::Completed) > 0);
    }

    #[tokio::test]
    async fn disabled_capability_steps_are_skipped() {
        let world = MockWorld::new();
        let mut config = ChoreoConfig::default();
        config.features.documentation = false;
        let c = Choreographer::new(world.collaborators(), &config);

        let outcome = c.orchestrate(critical(), roster()).await;
        let postmortem = outcome.workflow.step_for_action(ActionKind::CreatePostmortem).unwrap();
        assert_eq!(postmortem.status, StepStatus::Skipped);
        assert_eq!(world.calls(Capability::Documentation), 0);
    }

    #[tokio::test]
    async fn registry_holds_final_snapshot() {
        let world = MockWorld::new();
        let c = choreographer(&world);
        let outcome = c.orchestrate(critical(), roster()).await;

        let stored = c.workflow_status(outcome.workflow.id).unwrap();
        assert_eq!(stored.status, WorkflowStatus::Completed);
        assert_eq!(stored.steps.len(), outcome.workflow.steps.len());
        assert_eq!(c.registry().find_by_incident(outcome.incident.id).len(), 1);
        assert_eq!(c.list_workflows().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_runs_register_independently() {
        let world = MockWorld::new();
        let c = Arc::new(choreographer(&world));

        let mut handles = Vec::new();
        for i in 0..8 {
            let c = c.clone();
            handles.push(tokio::spawn(async move {
                let incident = Incident::new(format!("incident {i}"), "d", Severity::High);
                c.orchestrate(incident, roster()).await
            }));
        }
        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            let outcome = handle.await.unwrap();
            assert!(outcome.workflow.is_terminal());
            ids.insert(outcome.workflow.id);
        }

        assert_eq!(ids.len(), 8);
        assert_eq!(c.registry().len(), 8);
        assert!(c.list_workflows().iter().all(Workflow::is_terminal));
    }

    #[tokio::test]
    async fn context_overflow_aborts_the_run() {
        let world = MockWorld::new();
        let mut config = ChoreoConfig::default();
        // Room for the ticket payload, not for the channel payload on top.
        config.dispatch.max_context_bytes = 100;
        let c = Choreographer::new(world.collaborators(), &config);

        let outcome = c.orchestrate(critical(), roster()).await;
        let wf = &outcome.workflow;
        assert_eq!(outcome.plan_source, PlanSource::Fallback);
        assert_eq!(wf.status, WorkflowStatus::Completed);
        assert!(!wf.succeeded());
        assert_eq!(wf.errors.len(), 1);
        assert!(wf.errors[0].contains("exceeds maximum (100 bytes)"));

        assert_eq!(actions(wf)[..2], ["create_ticket", "create_channel"]);
        assert_eq!(wf.steps[0].status, StepStatus::Completed);
        assert!(wf.steps[1].status.is_terminal());
        assert!(wf.steps[2..].iter().all(|s| s.status == StepStatus::Skipped));
        assert_eq!(world.method_calls("chat_notify"), 0);
        assert_eq!(world.calls(Capability::Documentation), 0);

        let stored = c.workflow_status(wf.id).unwrap();
        assert_eq!(stored.errors, wf.errors);
        assert_eq!(stored.count_by_status(StepStatus::Skipped), wf.steps.len() - 2);
    }

    #[tokio::test]
    async fn registry_shows_the_step_in_flight() {
        let world = MockWorld::new();
        world.set_latency(std::time::Duration::from_millis(50));
        let c = Arc::new(choreographer(&world));

        let run = {
            let c = c.clone();
            tokio::spawn(async move { c.orchestrate(critical(), roster()).await })
        };

        let mut seen_running = None;
        for _ in 0..400 {
            let running = c.list_workflows().into_iter().find_map(|w| {
                w.steps
                    .iter()
                    .find(|s| s.status == StepStatus::Running)
                    .map(|s| s.action.clone())
            });
            if running.is_some() {
                seen_running = running;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let outcome = run.await.unwrap();
        let action = seen_running.expect("a running step is published before dispatch completes");
        assert!(outcome.workflow.steps.iter().any(|s| s.action == action));
        assert!(outcome.workflow.steps.iter().all(|s| s.status.is_terminal()));
        assert_eq!(c.workflow_status(outcome.workflow.id).unwrap().count_by_status(StepStatus::Running), 0);
    }

    #[test]
    fn workflow_name_truncates_long_titles() {
        let incident = Incident::new("x".repeat(80), "d", Severity::Low);
        assert_eq!(workflow_name(&incident), format!("Incident Response: {}", "x".repeat(50)));
    }

    #[test]
    fn top_level_fault_skips_remaining_steps() {
        let steps: Vec<WorkflowStep> = fallback_plan(Severity::Low)
            .into_iter()
            .map(WorkflowStep::from_descriptor)
            .collect();
        let mut wf = Workflow::new(Uuid::now_v7(), "wf", "", steps);
        wf.start();
        wf.steps[0].start();
        wf.steps[0].finish(choreo_types::action::ActionResult::ok(
            "create_ticket",
            "ticketing",
            "",
            serde_json::json!({}),
        ));
        wf.steps[1].start();

        abort_run(&mut wf, 1, &RunFault::Panicked("boom".to_string()));
        wf.complete();

        assert!(!wf.succeeded());
        assert_eq!(wf.status, WorkflowStatus::Completed);
        assert_eq!(wf.steps[0].status, StepStatus::Completed);
        assert_eq!(wf.steps[1].status, StepStatus::Failed);
        assert_eq!(wf.steps[2].status, StepStatus::Skipped);
        assert!(wf.errors[0].contains("boom"));
    }
}
