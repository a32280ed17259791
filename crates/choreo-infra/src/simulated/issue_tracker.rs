//! Simulated issue tracker.

use std::sync::Arc;

use choreo_core::collaborator::{CollabFuture, IssueTracker};
use choreo_types::collaborator::{Capability, IssueCreated};
use choreo_types::error::CollaboratorError;
use choreo_types::incident::Incident;

use super::SimState;

const PROJECT_KEY: &str = "OPS";
const ISSUE_BASE_URL: &str = "https://issues.example.com/browse";

pub struct SimulatedIssueTracker {
    state: Arc<SimState>,
}

impl SimulatedIssueTracker {
    pub(crate) fn new(state: Arc<SimState>) -> Self {
        Self { state }
    }
}

impl IssueTracker for SimulatedIssueTracker {
    fn create_issue<'a>(&'a self, incident: &'a Incident) -> CollabFuture<'a, IssueCreated> {
        Box::pin(async move {
            let n = self
                .state
                .enter(Capability::IssueTracker, "create_issue", incident.title.as_str())
                .await?;
            let issue_key = format!("{PROJECT_KEY}-{n}");
            Ok(IssueCreated {
                url: format!("{ISSUE_BASE_URL}/{issue_key}"),
                issue_key,
            })
        })
    }

    fn assign<'a>(&'a self, issue_key: &'a str, identity: &'a str) -> CollabFuture<'a, ()> {
        Box::pin(async move {
            if !identity.contains('@') {
                return Err(CollaboratorError::Rejected(format!(
                    "cannot assign {issue_key}: '{identity}' is not an email address"
                )));
            }
            self.state
                .enter(Capability::IssueTracker, "assign", format!("{issue_key} -> {identity}"))
                .await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::SimulatedWorld;
    use super::*;
    use choreo_types::incident::Severity;

    #[tokio::test]
    async fn issue_keys_use_project_prefix() {
        let collaborators = SimulatedWorld::new().collaborators();
        let incident = Incident::new("t", "d", Severity::Low);
        let issue = collaborators.issue_tracker.create_issue(&incident).await.unwrap();
        assert!(issue.issue_key.starts_with("OPS-"));
        assert!(issue.url.ends_with(&issue.issue_key));
    }

    #[tokio::test]
    async fn assign_rejects_non_email_identity() {
        let collaborators = SimulatedWorld::new().collaborators();
        let err = collaborators.issue_tracker.assign("OPS-1", "riley").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Rejected(_)));
    }
}
