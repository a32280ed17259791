//! Diagnostics gathering and recommendation rules for the playbook.

use choreo_types::collaborator::{BuildRun, Commit, Deployment};
use choreo_types::incident::{Category, Incident, Severity};
use serde::Serialize;

use crate::collaborator::CodeHost;

/// Lookback for critical and high incidents.
pub const URGENT_LOOKBACK_HOURS: u32 = 48;
/// Lookback for everything else.
pub const DEFAULT_LOOKBACK_HOURS: u32 = 72;

pub const MAX_COMMITS_PER_REPO: usize = 10;
pub const MAX_DEPLOYMENTS_PER_REPO: usize = 5;
pub const MAX_FAILED_RUNS_PER_REPO: usize = 5;

/// Build-run status queried for CI failures.
const FAILED_RUN_STATUS: &str = "failure";

/// Log sources reported as queued for collection.
pub const LOG_SOURCES: [&str; 2] = ["application", "infrastructure"];

pub fn lookback_hours(severity: Severity) -> u32 {
    if severity.is_urgent() {
        URGENT_LOOKBACK_HOURS
    } else {
        DEFAULT_LOOKBACK_HOURS
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RepoChanges {
    pub repository: String,
    pub total_commits: usize,
    pub commits: Vec<Commit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepoDeployments {
    pub repository: String,
    pub deployments: Vec<Deployment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepoFailedRuns {
    pub repository: String,
    pub failed_runs: Vec<BuildRun>,
}

/// Everything the diagnostics stage collected, per repository.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub lookback_hours: u32,
    pub recent_commits: Vec<RepoChanges>,
    pub recent_deployments: Vec<RepoDeployments>,
    pub failed_workflows: Vec<RepoFailedRuns>,
    pub log_sources: Vec<String>,
    /// Code-host calls made.
    #[serde(skip)]
    pub attempted: usize,
    /// One entry per failed code-host call.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

impl Diagnostics {
    /// Commits across all repositories, in repository order.
    pub fn commits(&self) -> impl Iterator<Item = &Commit> {
        self.recent_commits.iter().flat_map(|r| r.commits.iter())
    }

    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failures.len() == self.attempted
    }
}

/// Query recent changes, deployments and failed build runs for every
/// repository. Individual call failures are collected, not raised.
pub async fn gather(
    code_host: &dyn CodeHost,
    incident: &Incident,
    repositories: &[String],
    environment: &str,
) -> Diagnostics {
    let hours = lookback_hours(incident.severity);
    let mut diagnostics = Diagnostics {
        lookback_hours: hours,
        log_sources: LOG_SOURCES.iter().map(|s| s.to_string()).collect(),
        ..Diagnostics::default()
    };

    for repo in repositories {
        diagnostics.attempted += 1;
        match code_host
            .recent_changes(repo, hours, &incident.affected_services)
            .await
        {
            Ok(summary) => diagnostics.recent_commits.push(RepoChanges {
                repository: repo.clone(),
                total_commits: summary.total,
                commits: summary.commits.into_iter().take(MAX_COMMITS_PER_REPO).collect(),
            }),
            Err(e) => diagnostics.failures.push(format!("{repo}: recent changes: {e}")),
        }
    }

    for repo in repositories {
        diagnostics.attempted += 1;
        match code_host.recent_deployments(repo, Some(environment)).await {
            Ok(deployments) => diagnostics.recent_deployments.push(RepoDeployments {
                repository: repo.clone(),
                deployments: deployments.into_iter().take(MAX_DEPLOYMENTS_PER_REPO).collect(),
            }),
            Err(e) => diagnostics.failures.push(format!("{repo}: deployments: {e}")),
        }
    }

    for repo in repositories {
        diagnostics.attempted += 1;
        match code_host.workflow_runs(repo, Some(FAILED_RUN_STATUS)).await {
            Ok(runs) => diagnostics.failed_workflows.push(RepoFailedRuns {
                repository: repo.clone(),
                failed_runs: runs.into_iter().take(MAX_FAILED_RUNS_PER_REPO).collect(),
            }),
            Err(e) => diagnostics.failures.push(format!("{repo}: workflow runs: {e}")),
        }
    }

    diagnostics
}

fn category_hint(category: Category) -> Option<&'static str> {
    match category {
        Category::Database => Some("Check database connection pools and recent schema changes"),
        Category::Infrastructure => Some("Verify container/pod health and resource limits"),
        Category::Network => Some("Check DNS resolution and load balancer health"),
        Category::Security => Some("Review authentication logs and access patterns"),
        Category::Application => Some("Check application logs for exceptions and errors"),
        Category::Performance | Category::Integration | Category::Unknown => None,
    }
}

/// Follow-up recommendations derived from the diagnostics.
pub fn recommendations(incident: &Incident, diagnostics: &Diagnostics) -> Vec<String> {
    let mut out = Vec::new();
    for repo in &diagnostics.recent_deployments {
        if !repo.deployments.is_empty() {
            out.push(format!(
                "Recent deployment detected in {} - consider rollback if needed",
                repo.repository
            ));
        }
    }
    for repo in &diagnostics.failed_workflows {
        if !repo.failed_runs.is_empty() {
            out.push(format!(
                "Failed CI/CD runs in {} - investigate build failures",
                repo.repository
            ));
        }
    }
    if let Some(hint) = category_hint(incident.category) {
        out.push(hint.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use choreo_types::collaborator::Capability;

    use crate::testing::MockWorld;

    fn repos() -> Vec<String> {
        vec!["acme/api".to_string(), "acme/web".to_string()]
    }

    #[test]
    fn lookback_depends_on_severity() {
        assert_eq!(lookback_hours(Severity::Critical), 48);
        assert_eq!(lookback_hours(Severity::High), 48);
        assert_eq!(lookback_hours(Severity::Medium), 72);
        assert_eq!(lookback_hours(Severity::Low), 72);
    }

    #[tokio::test]
    async fn gather_caps_results_per_repository() {
        let world = MockWorld::new();
        let incident = Incident::new("t", "d", Severity::High);
        let d = gather(&*world, &incident, &repos(), "production").await;

        assert_eq!(d.attempted, 6);
        assert!(d.failures.is_empty());
        assert_eq!(d.recent_commits.len(), 2);
        assert_eq!(d.recent_commits[0].total_commits, 12);
        assert_eq!(d.recent_commits[0].commits.len(), MAX_COMMITS_PER_REPO);
        assert_eq!(d.recent_deployments[0].deployments.len(), MAX_DEPLOYMENTS_PER_REPO);
        assert_eq!(d.failed_workflows[1].failed_runs.len(), MAX_FAILED_RUNS_PER_REPO);
        assert_eq!(d.failed_workflows[0].failed_runs[0].status, "failure");
        assert_eq!(d.commits().count(), 20);
    }

    #[tokio::test]
    async fn gather_collects_failures() {
        let world = MockWorld::new();
        world.fail(Capability::CodeHost);
        let incident = Incident::new("t", "d", Severity::Low);
        let d = gather(&*world, &incident, &repos(), "production").await;

        assert!(d.all_failed());
        assert_eq!(d.failures.len(), 6);
        assert_eq!(d.commits().count(), 0);
    }

    #[test]
    fn recommendations_follow_evidence_and_category() {
        let incident = Incident::new("t", "d", Severity::High).with_category(Category::Database);
        let diagnostics = Diagnostics {
            recent_deployments: vec![RepoDeployments {
                repository: "acme/api".to_string(),
                deployments: vec![Deployment {
                    id: "d1".to_string(),
                    environment: "production".to_string(),
                    reference: "main".to_string(),
                    status: "success".to_string(),
                    created_at: Utc::now(),
                }],
            }],
            failed_workflows: vec![RepoFailedRuns {
                repository: "acme/web".to_string(),
                failed_runs: Vec::new(),
            }],
            ..Diagnostics::default()
        };

        let recs = recommendations(&incident, &diagnostics);
        assert_eq!(recs.len(), 2);
        assert!(recs[0].contains("acme/api") && recs[0].contains("rollback"));
        assert!(recs[1].contains("connection pools"));
    }

    #[test]
    fn no_category_hint_for_unknown() {
        let incident = Incident::new("t", "d", Severity::Low);
        assert!(recommendations(&incident, &Diagnostics::default()).is_empty());
    }
}
