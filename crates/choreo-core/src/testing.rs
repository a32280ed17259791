//! Recording mock collaborators for engine tests.
//!
//! `MockWorld` implements every collaborator port. Calls are recorded per
//! capability; failures and panics can be scripted per capability or per
//! method name.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use choreo_types::collaborator::{
    BuildRun, Capability, ChangeSummary, ChannelCreated, Classification, Commit, Deployment,
    HypothesisInput, IssueCreated, KnowledgeArticle, PageCreated, TeamAssembled, TicketCreated,
    UpdateKind,
};
use choreo_types::error::{CollaboratorError, DecisionError};
use choreo_types::incident::Incident;
use choreo_types::team::TeamMember;
use choreo_types::workflow::RawStepDescriptor;

use crate::collaborator::{
    Chat, CodeHost, CollabFuture, Collaborators, DecisionFuture, DecisionProvider, Documentation,
    IssueTracker, Ticketing,
};

#[derive(Default)]
pub struct MockWorld {
    calls: Mutex<Vec<(Capability, &'static str)>>,
    failing: Mutex<HashSet<Capability>>,
    failing_methods: Mutex<HashSet<&'static str>>,
    panicking: Mutex<HashSet<Capability>>,
    plan: Mutex<Option<Vec<RawStepDescriptor>>>,
    latency: Mutex<Option<Duration>>,
    sequence: AtomicUsize,
}

impl MockWorld {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            ticketing: self.clone(),
            chat: self.clone(),
            code_host: self.clone(),
            documentation: self.clone(),
            issue_tracker: self.clone(),
            decision: self.clone(),
        }
    }

    /// Every call to `capability` returns an error.
    pub fn fail(&self, capability: Capability) {
        self.failing.lock().unwrap().insert(capability);
    }

    /// Calls to the named method return an error.
    pub fn fail_method(&self, method: &'static str) {
        self.failing_methods.lock().unwrap().insert(method);
    }

    /// Every call to `capability` panics.
    pub fn panic_on(&self, capability: Capability) {
        self.panicking.lock().unwrap().insert(capability);
    }

    /// Every successful call waits `latency` before answering.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// Script the decision service's recommended plan.
    pub fn set_plan(&self, plan: Vec<RawStepDescriptor>) {
        *self.plan.lock().unwrap() = Some(plan);
    }

    pub fn calls(&self, capability: Capability) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == capability)
            .count()
    }

    pub fn method_calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m)| *m == method)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn enter(&self, capability: Capability, method: &'static str) -> Result<usize, CollaboratorError> {
        self.calls.lock().unwrap().push((capability, method));
        if self.panicking.lock().unwrap().contains(&capability) {
            panic!("{capability} mock panicked in {method}");
        }
        if self.failing.lock().unwrap().contains(&capability)
            || self.failing_methods.lock().unwrap().contains(method)
        {
            return Err(CollaboratorError::Unavailable(capability.to_string()));
        }
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn enter_decision(&self, method: &'static str) -> Result<(), DecisionError> {
        self.enter(Capability::Decision, method)
            .await
            .map(|_| ())
            .map_err(|e| DecisionError::Backend(e.to_string()))
    }
}

/// A small roster: two on-call members, a DBA and a network engineer.
pub fn roster() -> Vec<TeamMember> {
    vec![
        TeamMember::new("u-oncall-1", "Riley", "riley@example.com")
            .with_skills(["sre"])
            .on_call(true),
        TeamMember::new("u-dba", "Sam", "sam@example.com").with_skills(["postgresql", "dba"]),
        TeamMember::new("u-net", "Kai", "kai@example.com").with_skills(["dns", "networking"]),
        TeamMember::new("u-oncall-2", "Noor", "noor@example.com")
            .with_skills(["backend"])
            .on_call(true),
    ]
}

impl Ticketing for MockWorld {
    fn create<'a>(&'a self, _incident: &'a Incident) -> CollabFuture<'a, TicketCreated> {
        Box::pin(async move {
            let n = self.enter(Capability::Ticketing, "ticket_create").await?;
            Ok(TicketCreated {
                external_id: format!("INC{n:07}"),
                link: format!("https://tickets.test/INC{n:07}"),
            })
        })
    }

    fn add_note<'a>(&'a self, _external_id: &'a str, _text: &'a str) -> CollabFuture<'a, ()> {
        Box::pin(async move {
            self.enter(Capability::Ticketing, "ticket_add_note").await?;
            Ok(())
        })
    }
}

impl Chat for MockWorld {
    fn create_channel<'a>(&'a self, _incident: &'a Incident) -> CollabFuture<'a, ChannelCreated> {
        Box::pin(async move {
            let n = self.enter(Capability::Chat, "chat_create_channel").await?;
            Ok(ChannelCreated {
                channel_id: format!("C{n:05}"),
                channel_name: format!("inc-{n}"),
                link: format!("https://chat.test/C{n:05}"),
            })
        })
    }

    fn notify<'a>(
        &'a self,
        _channel: &'a str,
        _message: &'a str,
        _incident: Option<&'a Incident>,
    ) -> CollabFuture<'a, ()> {
        Box::pin(async move {
            self.enter(Capability::Chat, "chat_notify").await?;
            Ok(())
        })
    }

    fn assemble_team<'a>(
        &'a self,
        _incident: &'a Incident,
        members: &'a [TeamMember],
        _channel: &'a str,
    ) -> CollabFuture<'a, TeamAssembled> {
        Box::pin(async move {
            self.enter(Capability::Chat, "chat_assemble_team").await?;
            Ok(TeamAssembled {
                assembled_count: members.len(),
            })
        })
    }

    fn post_update<'a>(
        &'a self,
        _channel: &'a str,
        _incident: &'a Incident,
        _kind: UpdateKind,
        _details: &'a str,
    ) -> CollabFuture<'a, ()> {
        Box::pin(async move {
            self.enter(Capability::Chat, "chat_post_update").await?;
            Ok(())
        })
    }
}

impl CodeHost for MockWorld {
    fn recent_changes<'a>(
        &'a self,
        repo: &'a str,
        _hours_back: u32,
        _paths: &'a [String],
    ) -> CollabFuture<'a, ChangeSummary> {
        Box::pin(async move {
            self.enter(Capability::CodeHost, "code_recent_changes").await?;
            let commits: Vec<Commit> = (0..12)
                .map(|i| Commit {
                    sha: format!("{i:07x}"),
                    message: format!("change {i}"),
                    author: "dev".to_string(),
                    committed_at: Utc::now(),
                    files_changed: Vec::new(),
                    url: format!("https://code.test/{repo}/commit/{i}"),
                })
                .collect();
            Ok(ChangeSummary {
                repository: repo.to_string(),
                total: commits.len(),
                commits,
            })
        })
    }

    fn recent_deployments<'a>(
        &'a self,
        repo: &'a str,
        environment: Option<&'a str>,
    ) -> CollabFuture<'a, Vec<Deployment>> {
        Box::pin(async move {
            self.enter(Capability::CodeHost, "code_recent_deployments").await?;
            Ok((0..7)
                .map(|i| Deployment {
                    id: format!("{repo}-d{i}"),
                    environment: environment.unwrap_or("production").to_string(),
                    reference: "main".to_string(),
                    status: "success".to_string(),
                    created_at: Utc::now(),
                })
                .collect())
        })
    }

    fn workflow_runs<'a>(
        &'a self,
        repo: &'a str,
        status: Option<&'a str>,
    ) -> CollabFuture<'a, Vec<BuildRun>> {
        Box::pin(async move {
            self.enter(Capability::CodeHost, "code_workflow_runs").await?;
            Ok((0..6)
                .map(|i| BuildRun {
                    id: format!("{repo}-r{i}"),
                    name: "ci".to_string(),
                    status: status.unwrap_or("completed").to_string(),
                    branch: "main".to_string(),
                    url: format!("https://code.test/{repo}/runs/{i}"),
                    created_at: Utc::now(),
                })
                .collect())
        })
    }
}

impl Documentation for MockWorld {
    fn create_postmortem<'a>(&'a self, incident: &'a Incident) -> CollabFuture<'a, PageCreated> {
        Box::pin(async move {
            let n = self.enter(Capability::Documentation, "doc_create_postmortem").await?;
            Ok(PageCreated {
                page_id: format!("P{n}"),
                url: format!("https://docs.test/P{n}"),
                title: format!("Post-Mortem: {}", incident.title),
            })
        })
    }

    fn search<'a>(&'a self, query: &'a str) -> CollabFuture<'a, Vec<KnowledgeArticle>> {
        Box::pin(async move {
            self.enter(Capability::Documentation, "doc_search").await?;
            Ok(vec![KnowledgeArticle {
                id: "K1".to_string(),
                title: format!("Runbook for {query}"),
                url: "https://docs.test/K1".to_string(),
                excerpt: String::new(),
            }])
        })
    }
}

impl IssueTracker for MockWorld {
    fn create_issue<'a>(&'a self, _incident: &'a Incident) -> CollabFuture<'a, IssueCreated> {
        Box::pin(async move {
            let n = self.enter(Capability::IssueTracker, "issue_create").await?;
            Ok(IssueCreated {
                issue_key: format!("OPS-{n}"),
                url: format!("https://issues.test/OPS-{n}"),
            })
        })
    }

    fn assign<'a>(&'a self, _issue_key: &'a str, _identity: &'a str) -> CollabFuture<'a, ()> {
        Box::pin(async move {
            self.enter(Capability::IssueTracker, "issue_assign").await?;
            Ok(())
        })
    }
}

impl DecisionProvider for MockWorld {
    fn classify<'a>(
        &'a self,
        _title: &'a str,
        _description: &'a str,
        _context: Option<&'a serde_json::Value>,
    ) -> DecisionFuture<'a, Classification> {
        Box::pin(async move {
            self.enter_decision("decision_classify").await?;
            Err(DecisionError::Unavailable)
        })
    }

    fn recommend_steps<'a>(
        &'a self,
        _incident: &'a Incident,
        _available: &'a [Capability],
    ) -> DecisionFuture<'a, Vec<RawStepDescriptor>> {
        Box::pin(async move {
            self.enter_decision("decision_recommend").await?;
            self.plan
                .lock()
                .unwrap()
                .clone()
                .ok_or(DecisionError::Unavailable)
        })
    }

    fn generate_hypothesis<'a>(
        &'a self,
        incident: &'a Incident,
        input: &'a HypothesisInput,
    ) -> DecisionFuture<'a, String> {
        Box::pin(async move {
            self.enter_decision("decision_hypothesis").await?;
            let evidence = if input.changes.is_some() { "recent changes" } else { "symptoms" };
            Ok(format!("{} likely caused by {evidence}", incident.title))
        })
    }
}
