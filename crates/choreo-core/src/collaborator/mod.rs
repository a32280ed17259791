//! Collaborator ports: the narrow interfaces the engine consumes.
//!
//! Each trait is object-safe (boxed futures with an explicit lifetime) so the
//! engine can hold `Arc<dyn Trait>` and receive implementations at
//! construction time. Implementations live in `choreo-infra` (simulated) or
//! in whatever service embeds the engine.
//!
//! Ordinary failures are returned as `Err(CollaboratorError)`; a collaborator
//! must not panic for expected failure modes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use choreo_types::collaborator::{
    BuildRun, Capability, ChangeSummary, ChannelCreated, Classification, Deployment,
    HypothesisInput, IssueCreated, KnowledgeArticle, PageCreated, TeamAssembled, TicketCreated,
    UpdateKind,
};
use choreo_types::error::{CollaboratorError, DecisionError};
use choreo_types::incident::Incident;
use choreo_types::team::TeamMember;
use choreo_types::workflow::RawStepDescriptor;

/// Boxed future returned by collaborator calls.
pub type CollabFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CollaboratorError>> + Send + 'a>>;

/// Boxed future returned by decision service calls.
pub type DecisionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DecisionError>> + Send + 'a>>;

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Ticketing system (incident tickets and work notes).
pub trait Ticketing: Send + Sync {
    fn create<'a>(&'a self, incident: &'a Incident) -> CollabFuture<'a, TicketCreated>;

    fn add_note<'a>(&'a self, external_id: &'a str, text: &'a str) -> CollabFuture<'a, ()>;
}

/// Team chat (incident channels, notifications, structured updates).
pub trait Chat: Send + Sync {
    fn create_channel<'a>(&'a self, incident: &'a Incident) -> CollabFuture<'a, ChannelCreated>;

    fn notify<'a>(
        &'a self,
        channel: &'a str,
        message: &'a str,
        incident: Option<&'a Incident>,
    ) -> CollabFuture<'a, ()>;

    fn assemble_team<'a>(
        &'a self,
        incident: &'a Incident,
        members: &'a [TeamMember],
        channel: &'a str,
    ) -> CollabFuture<'a, TeamAssembled>;

    fn post_update<'a>(
        &'a self,
        channel: &'a str,
        incident: &'a Incident,
        kind: UpdateKind,
        details: &'a str,
    ) -> CollabFuture<'a, ()>;
}

/// Code host (commit history, deployments, CI runs).
pub trait CodeHost: Send + Sync {
    fn recent_changes<'a>(
        &'a self,
        repo: &'a str,
        hours_back: u32,
        paths: &'a [String],
    ) -> CollabFuture<'a, ChangeSummary>;

    fn recent_deployments<'a>(
        &'a self,
        repo: &'a str,
        environment: Option<&'a str>,
    ) -> CollabFuture<'a, Vec<Deployment>>;

    fn workflow_runs<'a>(
        &'a self,
        repo: &'a str,
        status: Option<&'a str>,
    ) -> CollabFuture<'a, Vec<BuildRun>>;
}

/// Documentation space (post-mortem pages, knowledge search).
pub trait Documentation: Send + Sync {
    fn create_postmortem<'a>(&'a self, incident: &'a Incident) -> CollabFuture<'a, PageCreated>;

    fn search<'a>(&'a self, query: &'a str) -> CollabFuture<'a, Vec<KnowledgeArticle>>;
}

/// Issue tracker (work items and assignment).
pub trait IssueTracker: Send + Sync {
    fn create_issue<'a>(&'a self, incident: &'a Incident) -> CollabFuture<'a, IssueCreated>;

    fn assign<'a>(&'a self, issue_key: &'a str, identity: &'a str) -> CollabFuture<'a, ()>;
}

/// AI decision service: classification, planning, hypotheses.
pub trait DecisionProvider: Send + Sync {
    fn classify<'a>(
        &'a self,
        title: &'a str,
        description: &'a str,
        context: Option<&'a serde_json::Value>,
    ) -> DecisionFuture<'a, Classification>;

    /// Propose an ordered plan using only `available` collaborators.
    fn recommend_steps<'a>(
        &'a self,
        incident: &'a Incident,
        available: &'a [Capability],
    ) -> DecisionFuture<'a, Vec<RawStepDescriptor>>;

    fn generate_hypothesis<'a>(
        &'a self,
        incident: &'a Incident,
        input: &'a HypothesisInput,
    ) -> DecisionFuture<'a, String>;
}

// ---------------------------------------------------------------------------
// Collaborators bundle
// ---------------------------------------------------------------------------

/// The full set of collaborator references handed to the engine.
#[derive(Clone)]
pub struct Collaborators {
    pub ticketing: Arc<dyn Ticketing>,
    pub chat: Arc<dyn Chat>,
    pub code_host: Arc<dyn CodeHost>,
    pub documentation: Arc<dyn Documentation>,
    pub issue_tracker: Arc<dyn IssueTracker>,
    pub decision: Arc<dyn DecisionProvider>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
