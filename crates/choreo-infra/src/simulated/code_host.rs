//! Simulated code host: commits, deployments and CI runs.
//!
//! Results are derived from the repository name so repeated runs see the
//! same history.

use std::sync::Arc;

use chrono::{Duration, Utc};
use choreo_core::collaborator::{CodeHost, CollabFuture};
use choreo_types::collaborator::{BuildRun, Capability, ChangeSummary, Commit, Deployment};
use choreo_types::error::CollaboratorError;

use super::SimState;

const CODE_BASE_URL: &str = "https://code.example.com";

const COMMIT_MESSAGES: [&str; 6] = [
    "Bump connection pool size",
    "Refactor retry handling in client",
    "Add index on orders.created_at",
    "Update load balancer health check path",
    "Upgrade runtime base image",
    "Tune cache eviction thresholds",
];

const AUTHORS: [&str; 3] = ["alex", "jordan", "casey"];

pub struct SimulatedCodeHost {
    state: Arc<SimState>,
}

impl SimulatedCodeHost {
    pub(crate) fn new(state: Arc<SimState>) -> Self {
        Self { state }
    }
}

/// Stable 32-bit FNV-1a hash of a repository name.
fn repo_seed(repo: &str) -> u32 {
    repo.bytes()
        .fold(0x811c_9dc5_u32, |h, b| (h ^ u32::from(b)).wrapping_mul(0x0100_0193))
}

fn check_repo(repo: &str) -> Result<(), CollaboratorError> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => Ok(()),
        _ => Err(CollaboratorError::NotFound(format!("repository '{repo}'"))),
    }
}

impl CodeHost for SimulatedCodeHost {
    fn recent_changes<'a>(
        &'a self,
        repo: &'a str,
        hours_back: u32,
        paths: &'a [String],
    ) -> CollabFuture<'a, ChangeSummary> {
        Box::pin(async move {
            self.state
                .enter(Capability::CodeHost, "recent_changes", format!("{repo} ({hours_back}h)"))
                .await?;
            check_repo(repo)?;

            let seed = repo_seed(repo);
            let now = Utc::now();
            // One commit every eight hours inside the window.
            let count = (hours_back / 8).min(COMMIT_MESSAGES.len() as u32) as usize;
            let commits = (0..count)
                .map(|i| {
                    let sha = format!("{:08x}", seed.wrapping_add(i as u32 * 7919));
                    Commit {
                        message: COMMIT_MESSAGES[(seed as usize + i) % COMMIT_MESSAGES.len()].to_string(),
                        author: AUTHORS[i % AUTHORS.len()].to_string(),
                        committed_at: now - Duration::hours(i as i64 * 8 + 1),
                        files_changed: paths.iter().take(1).cloned().collect(),
                        url: format!("{CODE_BASE_URL}/{repo}/commit/{sha}"),
                        sha,
                    }
                })
                .collect::<Vec<_>>();
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
            let environment = environment.unwrap_or("production");
            self.state
                .enter(Capability::CodeHost, "recent_deployments", format!("{repo} ({environment})"))
                .await?;
            check_repo(repo)?;

            let seed = repo_seed(repo);
            let now = Utc::now();
            Ok((0..2)
                .map(|i| Deployment {
                    id: format!("{}", seed % 100_000 + i),
                    environment: environment.to_string(),
                    reference: format!("v1.{}.{}", seed % 40, 3 - i),
                    status: "success".to_string(),
                    created_at: now - Duration::hours(i64::from(i) * 12 + 2),
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
            self.state
                .enter(
                    Capability::CodeHost,
                    "workflow_runs",
                    format!("{repo} ({})", status.unwrap_or("any")),
                )
                .await?;
            check_repo(repo)?;

            let seed = repo_seed(repo);
            let now = Utc::now();
            let runs = [("ci", "success"), ("deploy", "failure"), ("nightly", "success")]
                .into_iter()
                .enumerate()
                .filter(|(_, (_, run_status))| status.is_none_or(|s| s == *run_status))
                .map(|(i, (name, run_status))| BuildRun {
                    id: format!("{}", seed % 1_000_000 + i as u32),
                    name: name.to_string(),
                    status: run_status.to_string(),
                    branch: "main".to_string(),
                    url: format!("{CODE_BASE_URL}/{repo}/actions/runs/{i}"),
                    created_at: now - Duration::hours(i as i64 + 1),
                })
                .collect();
            Ok(runs)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::SimulatedWorld;

    #[tokio::test]
    async fn history_is_stable_for_a_repository() {
        let collaborators = SimulatedWorld::new().collaborators();
        let a = collaborators
            .code_host
            .recent_changes("acme/api", 24, &[])
            .await
            .unwrap();
        let b = collaborators
            .code_host
            .recent_changes("acme/api", 24, &[])
            .await
            .unwrap();
        assert_eq!(a.total, 3);
        let shas = |s: &choreo_types::collaborator::ChangeSummary| {
            s.commits.iter().map(|c| c.sha.clone()).collect::<Vec<_>>()
        };
        assert_eq!(shas(&a), shas(&b));
    }

    #[tokio::test]
    async fn run_status_filter_applies() {
        let collaborators = SimulatedWorld::new().collaborators();
        let failed = collaborators
            .code_host
            .workflow_runs("acme/api", Some("failure"))
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].name, "deploy");

        let all = collaborators.code_host.workflow_runs("acme/api", None).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn malformed_repository_is_not_found() {
        let collaborators = SimulatedWorld::new().collaborators();
        assert!(collaborators
            .code_host
            .recent_deployments("not-a-repo", None)
            .await
            .is_err());
    }
}
