//! Simulated documentation space with a small runbook library.

use std::sync::Arc;

use choreo_core::collaborator::{CollabFuture, Documentation};
use choreo_types::collaborator::{Capability, KnowledgeArticle, PageCreated};
use choreo_types::incident::Incident;

use super::SimState;

const DOCS_BASE_URL: &str = "https://docs.example.com/pages";
const MAX_SEARCH_RESULTS: usize = 5;

/// (id, title, keywords)
const RUNBOOKS: [(&str, &str, &[&str]); 6] = [
    ("RB-101", "Database failover runbook", &["database", "postgres", "db", "replica"]),
    ("RB-102", "Connection pool exhaustion", &["database", "pool", "api", "performance"]),
    ("RB-201", "Rolling back a bad deployment", &["application", "deploy", "rollback"]),
    ("RB-301", "Memory leak triage", &["infrastructure", "memory", "oom", "performance"]),
    ("RB-401", "Suspicious login investigation", &["security", "auth", "login"]),
    ("RB-501", "DNS and load balancer checks", &["network", "dns", "gateway", "lb"]),
];

pub struct SimulatedDocumentation {
    state: Arc<SimState>,
}

impl SimulatedDocumentation {
    pub(crate) fn new(state: Arc<SimState>) -> Self {
        Self { state }
    }
}

impl Documentation for SimulatedDocumentation {
    fn create_postmortem<'a>(&'a self, incident: &'a Incident) -> CollabFuture<'a, PageCreated> {
        Box::pin(async move {
            let n = self
                .state
                .enter(Capability::Documentation, "create_postmortem", incident.title.as_str())
                .await?;
            let page_id = format!("{}", 100_000 + n);
            Ok(PageCreated {
                url: format!("{DOCS_BASE_URL}/{page_id}"),
                title: format!(
                    "Post-Mortem: {} ({})",
                    incident.title,
                    incident.detected_at.format("%Y-%m-%d")
                ),
                page_id,
            })
        })
    }

    fn search<'a>(&'a self, query: &'a str) -> CollabFuture<'a, Vec<KnowledgeArticle>> {
        Box::pin(async move {
            self.state.enter(Capability::Documentation, "search", query).await?;
            let terms: Vec<String> = query
                .split_whitespace()
                .flat_map(|t| t.split('-'))
                .map(str::to_lowercase)
                .collect();
            Ok(RUNBOOKS
                .iter()
                .filter(|(_, _, keywords)| keywords.iter().any(|k| terms.iter().any(|t| t == k)))
                .take(MAX_SEARCH_RESULTS)
                .map(|(id, title, keywords)| KnowledgeArticle {
                    id: id.to_string(),
                    title: title.to_string(),
                    url: format!("{DOCS_BASE_URL}/{id}"),
                    excerpt: format!("Tags: {}", keywords.join(", ")),
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::SimulatedWorld;

    #[tokio::test]
    async fn search_matches_keywords() {
        let collaborators = SimulatedWorld::new().collaborators();
        let hits = collaborators
            .documentation
            .search("database orders-db")
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["RB-101", "RB-102"]);

        let none = collaborators.documentation.search("unknown").await.unwrap();
        assert!(none.is_empty());
    }
}
