//! Rule-based stand-in for the decision service.
//!
//! Classification uses keyword tables, plans are assembled from the
//! available capabilities, and hypotheses cite the supplied commits when
//! there are any.

use std::sync::Arc;

use choreo_core::collaborator::{DecisionFuture, DecisionProvider};
use choreo_core::workflow::builder::parse_recommendation;
use choreo_types::collaborator::{Capability, Classification, HypothesisInput, UpdateKind};
use choreo_types::error::DecisionError;
use choreo_types::incident::{Category, Incident, Severity};
use choreo_types::workflow::{ActionKind, RawStepDescriptor};
use serde_json::{json, Value};

use super::SimState;

/// How the scripted decision service behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionMode {
    /// Answer from keyword and capability rules.
    Rules,
    /// Refuse every request, as if no backend were configured.
    Unavailable,
}

const RULE_CONFIDENCE: f32 = 0.6;
const MAX_CITED_COMMITS: usize = 3;

/// Checked most severe first; the first hit wins.
const SEVERITY_KEYWORDS: [(Severity, &[&str]); 4] = [
    (
        Severity::Critical,
        &["critical", "fatal", "emergency", "outage", "down", "data loss", "breach"],
    ),
    (
        Severity::High,
        &["high", "severe", "major", "degraded", "failing", "error rate", "timeout"],
    ),
    (
        Severity::Medium,
        &["medium", "warning", "elevated", "increased", "performance", "slow"],
    ),
    (Severity::Low, &["low", "minor", "info", "notice"]),
];

/// The category with the most keyword hits wins; ties go to the earlier row.
const CATEGORY_KEYWORDS: [(Category, &[&str]); 6] = [
    (
        Category::Database,
        &["database", "db", "sql", "postgres", "mysql", "connection pool", "query", "deadlock", "replication"],
    ),
    (
        Category::Infrastructure,
        &["server", "container", "kubernetes", "k8s", "pod", "node", "cluster", "disk", "memory", "cpu"],
    ),
    (
        Category::Network,
        &["network", "dns", "load balancer", "firewall", "connection refused", "unreachable"],
    ),
    (
        Category::Security,
        &["security", "unauthorized", "breach", "attack", "vulnerability", "authentication", "access denied"],
    ),
    (
        Category::Application,
        &["application", "api", "service", "endpoint", "exception", "crash", "deploy"],
    ),
    (
        Category::Performance,
        &["performance", "slow", "latency", "response time", "throughput", "bottleneck"],
    ),
];

/// Scripted `DecisionProvider` backed by the simulated world's call log.
pub struct ScriptedDecision {
    state: Arc<SimState>,
    mode: DecisionMode,
}

impl ScriptedDecision {
    pub(crate) fn new(state: Arc<SimState>, mode: DecisionMode) -> Self {
        Self { state, mode }
    }

    async fn enter(&self, method: &'static str, detail: &str) -> Result<(), DecisionError> {
        if self.mode == DecisionMode::Unavailable {
            return Err(DecisionError::Unavailable);
        }
        self.state
            .enter(Capability::Decision, method, detail)
            .await
            .map(|_| ())
            .map_err(|e| DecisionError::Backend(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn classify_text(text: &str) -> (Severity, Category, Vec<&'static str>) {
    let text = text.to_lowercase();

    let severity = SEVERITY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(s, _)| *s)
        .unwrap_or(Severity::Medium);

    let mut best: Option<(Category, Vec<&'static str>)> = None;
    for (category, keywords) in CATEGORY_KEYWORDS {
        let hits: Vec<&'static str> = keywords.iter().copied().filter(|k| text.contains(k)).collect();
        if hits.len() > best.as_ref().map_or(0, |(_, h)| h.len()) {
            best = Some((category, hits));
        }
    }
    let (category, hits) = best.unwrap_or((Category::Unknown, Vec::new()));
    (severity, category, hits)
}

fn step(name: &str, action: ActionKind, parameters: Value) -> RawStepDescriptor {
    RawStepDescriptor {
        name: Some(name.to_string()),
        action: Some(action.into()),
        target: Some(action.capability().to_string()),
        parameters: Some(parameters),
    }
}

fn rule_plan(incident: &Incident, available: &[Capability]) -> Vec<RawStepDescriptor> {
    let candidates = [
        Some(step("Create incident ticket", ActionKind::CreateTicket, json!({}))),
        Some(step("Open incident channel", ActionKind::CreateChannel, json!({}))),
        incident
            .severity
            .is_urgent()
            .then(|| step("Page on-call responders", ActionKind::NotifyTeam, json!({}))),
        Some(step("Assemble response team", ActionKind::AssembleTeam, json!({}))),
        Some(step("Gather logs", ActionKind::GatherLogs, json!({}))),
        Some(step("Analyze recent commits", ActionKind::AnalyzeCommits, json!({}))),
        Some(step("Search runbooks", ActionKind::SearchKnowledge, json!({}))),
        Some(step("Generate root cause hypothesis", ActionKind::GenerateHypothesis, json!({}))),
        Some(step("Open follow-up issue", ActionKind::CreateIssue, json!({}))),
        Some(step(
            "Share analysis",
            ActionKind::PostUpdate,
            json!({ "update_type": UpdateKind::AnalysisComplete.as_str() }),
        )),
        Some(step("Draft postmortem", ActionKind::CreatePostmortem, json!({}))),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter(|s| {
            s.action
                .as_deref()
                .and_then(ActionKind::parse)
                .is_some_and(|kind| {
                    let needed = kind.capability();
                    // Logs are collected locally; no collaborator needed.
                    needed == Capability::Logging || available.contains(&needed)
                })
        })
        .collect()
}

/// Render a plan the way a language-model backend replies: a fenced JSON
/// array of step descriptors.
fn plan_reply(plan: &[RawStepDescriptor]) -> Result<String, DecisionError> {
    let body =
        serde_json::to_string_pretty(plan).map_err(|e| DecisionError::Backend(e.to_string()))?;
    Ok(format!("```json\n{body}\n```"))
}

fn cited_commits(changes: &Value) -> Vec<String> {
    changes
        .as_array()
        .map(|commits| {
            commits
                .iter()
                .take(MAX_CITED_COMMITS)
                .filter_map(|c| {
                    let sha = c.get("sha")?.as_str()?;
                    let message = c.get("message").and_then(Value::as_str).unwrap_or("");
                    let short: String = sha.chars().take(8).collect();
                    Some(format!("{short} ({message})"))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn category_hypothesis(category: Category) -> &'static str {
    match category {
        Category::Database => "database saturation, such as an exhausted connection pool or a slow query",
        Category::Infrastructure => "resource exhaustion on the hosting platform",
        Category::Network => "a routing, DNS or load balancer fault between services",
        Category::Security => "unauthorized access or a credential compromise",
        Category::Application => "a regression in application code",
        Category::Performance => "a capacity bottleneck under current load",
        Category::Integration => "a failing upstream or downstream integration",
        Category::Unknown => "an unidentified fault; more evidence is needed",
    }
}

fn hypothesis_text(incident: &Incident, input: &HypothesisInput) -> String {
    let services = if incident.affected_services.is_empty() {
        "the affected systems".to_string()
    } else {
        incident.affected_services.join(", ")
    };
    let commits = input.changes.as_ref().map(cited_commits).unwrap_or_default();
    if commits.is_empty() {
        format!(
            "Impact on {services} is most likely caused by {}.",
            category_hypothesis(incident.category)
        )
    } else {
        format!(
            "Impact on {services} most likely follows a recent change: {}. Review these commits first.",
            commits.join(", ")
        )
    }
}

// ---------------------------------------------------------------------------
// DecisionProvider
// ---------------------------------------------------------------------------

impl DecisionProvider for ScriptedDecision {
    fn classify<'a>(
        &'a self,
        title: &'a str,
        description: &'a str,
        context: Option<&'a Value>,
    ) -> DecisionFuture<'a, Classification> {
        Box::pin(async move {
            self.enter("classify", title).await?;
            let (severity, category, hits) = classify_text(&format!("{title} {description}"));
            let affected_systems = context
                .and_then(|c| c.get("services"))
                .and_then(Value::as_array)
                .map(|services| {
                    services
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            let reasoning = if hits.is_empty() {
                "No category keywords matched".to_string()
            } else {
                format!("Matched keywords: {}", hits.join(", "))
            };
            Ok(Classification {
                severity,
                category,
                confidence: RULE_CONFIDENCE,
                reasoning,
                affected_systems,
            })
        })
    }

    fn recommend_steps<'a>(
        &'a self,
        incident: &'a Incident,
        available: &'a [Capability],
    ) -> DecisionFuture<'a, Vec<RawStepDescriptor>> {
        Box::pin(async move {
            self.enter("recommend_steps", incident.title.as_str()).await?;
            let reply = plan_reply(&rule_plan(incident, available))?;
            parse_recommendation(&reply)
        })
    }

    fn generate_hypothesis<'a>(
        &'a self,
        incident: &'a Incident,
        input: &'a HypothesisInput,
    ) -> DecisionFuture<'a, String> {
        Box::pin(async move {
            self.enter("generate_hypothesis", incident.title.as_str()).await?;
            Ok(hypothesis_text(incident, input))
        })
    }
}
