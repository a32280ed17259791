//! In-memory simulated collaborators.
//!
//! Every port from `choreo_core::collaborator` has a simulated implementation
//! with deterministic identifiers, a shared call log, and per-capability
//! failure injection. Used by the CLI demos and by integration-style tests.

mod chat;
mod code_host;
mod decision;
mod documentation;
mod issue_tracker;
mod ticketing;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use choreo_core::collaborator::Collaborators;
use choreo_types::collaborator::Capability;
use choreo_types::error::CollaboratorError;
use tokio::sync::Mutex;

pub use chat::SimulatedChat;
pub use code_host::SimulatedCodeHost;
pub use decision::{DecisionMode, ScriptedDecision};
pub use documentation::SimulatedDocumentation;
pub use issue_tracker::SimulatedIssueTracker;
pub use ticketing::SimulatedTicketing;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// One recorded collaborator call.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub capability: Capability,
    pub method: &'static str,
    pub detail: String,
    pub succeeded: bool,
    pub at: DateTime<Utc>,
}

/// Call log shared by a world and every collaborator it wires.
#[derive(Default)]
pub(crate) struct CallLog {
    sequence: AtomicU32,
    calls: Mutex<Vec<CallRecord>>,
}

/// Per-wiring view of a world: failure plan, latency and the shared log.
pub(crate) struct SimState {
    failing: HashSet<Capability>,
    latency: Duration,
    log: Arc<CallLog>,
}

impl SimState {
    /// Record a call, wait out the simulated latency, and fail if the
    /// capability is marked failing. Returns the next sequence number.
    pub(crate) async fn enter(
        &self,
        capability: Capability,
        method: &'static str,
        detail: impl Into<String>,
    ) -> Result<u32, CollaboratorError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let failing = self.failing.contains(&capability);
        self.log.calls.lock().await.push(CallRecord {
            capability,
            method,
            detail: detail.into(),
            succeeded: !failing,
            at: Utc::now(),
        });
        if failing {
            tracing::debug!(collaborator = %capability, method, "simulated failure");
            return Err(CollaboratorError::Unavailable(format!(
                "{capability} (simulated outage)"
            )));
        }
        Ok(self.log.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

// ---------------------------------------------------------------------------
// SimulatedWorld
// ---------------------------------------------------------------------------

/// Builder and owner of a full set of simulated collaborators.
pub struct SimulatedWorld {
    failing: HashSet<Capability>,
    latency: Duration,
    decision_mode: DecisionMode,
    log: Arc<CallLog>,
}

impl SimulatedWorld {
    pub fn new() -> Self {
        Self {
            failing: HashSet::new(),
            latency: Duration::ZERO,
            decision_mode: DecisionMode::Rules,
            log: Arc::new(CallLog::default()),
        }
    }

    /// Make every call to the given capabilities fail.
    pub fn failing(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.failing.extend(capabilities);
        self
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_decision_mode(mut self, mode: DecisionMode) -> Self {
        self.decision_mode = mode;
        self
    }

    /// Wire one instance of each simulated collaborator. All wirings of a
    /// world share its call log and id sequence.
    pub fn collaborators(&self) -> Collaborators {
        let state = Arc::new(SimState {
            failing: self.failing.clone(),
            latency: self.latency,
            log: self.log.clone(),
        });
        Collaborators {
            ticketing: Arc::new(SimulatedTicketing::new(state.clone())),
            chat: Arc::new(SimulatedChat::new(state.clone())),
            code_host: Arc::new(SimulatedCodeHost::new(state.clone())),
            documentation: Arc::new(SimulatedDocumentation::new(state.clone())),
            issue_tracker: Arc::new(SimulatedIssueTracker::new(state.clone())),
            decision: Arc::new(ScriptedDecision::new(state, self.decision_mode)),
        }
    }

    /// Snapshot of every call made so far, in order.
    pub async fn calls(&self) -> Vec<CallRecord> {
        self.log.calls.lock().await.clone()
    }

    pub async fn call_count(&self, capability: Capability) -> usize {
        self.log
            .calls
            .lock()
            .await
            .iter()
            .filter(|c| c.capability == capability)
            .count()
    }
}

impl Default for SimulatedWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase, dash-separated slug of at most `max` characters.
pub(crate) fn slug(text: &str, max: usize) -> String {
    let mut out = String::with_capacity(max);
    let mut dash = false;
    for c in text.chars() {
        if out.len() >= max {
            break;
        }
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            dash = false;
        } else if !dash && !out.is_empty() {
            out.push('-');
            dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}
