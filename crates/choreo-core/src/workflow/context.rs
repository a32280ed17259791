//! Per-run execution context with action result tracking.
//!
//! `RunContext` is the mutable state that flows through one orchestration
//! run. It owns the incident for the duration of the run, carries the
//! responder roster, and records each dispatched action's result so later
//! steps can read earlier outputs. Size limits prevent unbounded growth.

use std::collections::HashMap;

use choreo_types::action::ActionResult;
use choreo_types::config::{DEFAULT_MAX_CONTEXT_BYTES, DEFAULT_MAX_RESULT_BYTES};
use choreo_types::incident::Incident;
use choreo_types::team::TeamMember;
use choreo_types::workflow::ActionKind;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::RunFault;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default maximum size of a single action's data payload (1 MB).
pub const MAX_RESULT_DATA_SIZE: usize = DEFAULT_MAX_RESULT_BYTES;

/// Default maximum total size of all recorded results (10 MB).
pub const MAX_CONTEXT_SIZE: usize = DEFAULT_MAX_CONTEXT_BYTES;

// ---------------------------------------------------------------------------
// RunContext
// ---------------------------------------------------------------------------

/// Mutable execution context for a single run.
///
/// The run is the only writer; no locking is involved.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub incident: Incident,
    pub roster: Vec<TeamMember>,
    /// Results keyed by action identifier. A repeated action overwrites.
    results: HashMap<String, ActionResult>,
    max_result_size: usize,
    max_context_size: usize,
}

impl RunContext {
    pub fn new(run_id: Uuid, incident: Incident, roster: Vec<TeamMember>) -> Self {
        Self {
            run_id,
            incident,
            roster,
            results: HashMap::new(),
            max_result_size: MAX_RESULT_DATA_SIZE,
            max_context_size: MAX_CONTEXT_SIZE,
        }
    }

    /// Override the payload and total size limits.
    pub fn with_limits(mut self, max_result_size: usize, max_context_size: usize) -> Self {
        self.max_result_size = max_result_size;
        self.max_context_size = max_context_size;
        self
    }

    /// Record an action's result.
    ///
    /// A data payload over the result limit is replaced by a truncation
    /// marker. Exceeding the context limit in total is a run fault.
    pub fn record(&mut self, action: &str, mut result: ActionResult) -> Result<(), RunFault> {
        if let Some(data) = &result.data {
            let size = serde_json::to_string(data).map(|s| s.len()).unwrap_or(0);
            if size > self.max_result_size {
                tracing::warn!(
                    run_id = %self.run_id,
                    action,
                    size,
                    max = self.max_result_size,
                    "action data exceeds size limit, truncating"
                );
                result.data = Some(json!({
                    "_truncated": true,
                    "_original_size": size,
                    "_message": format!(
                        "data exceeded {} byte limit and was truncated",
                        self.max_result_size
                    )
                }));
            }
        }
        self.results.insert(action.to_string(), result);

        let total = self.total_size();
        if total > self.max_context_size {
            return Err(RunFault::ContextOverflow {
                size: total,
                max: self.max_context_size,
            });
        }
        Ok(())
    }

    /// Result of an earlier action, if one ran.
    pub fn result(&self, action: ActionKind) -> Option<&ActionResult> {
        self.results.get(action.as_str())
    }

    /// Data payload of an earlier *successful* action. Missing, failed or
    /// skipped actions all read as "no data".
    pub fn upstream_data(&self, action: ActionKind) -> Option<&Value> {
        self.result(action)
            .filter(|r| r.success && !r.is_skipped())
            .and_then(|r| r.data.as_ref())
    }

    pub fn results(&self) -> &HashMap<String, ActionResult> {
        &self.results
    }

    /// Total serialized size of all recorded result data in bytes.
    pub fn total_size(&self) -> usize {
        self.results
            .values()
            .filter_map(|r| r.data.as_ref())
            .map(|v| serde_json::to_string(v).map(|s| s.len()).unwrap_or(0))
            .sum()
    }

    /// Hand the incident back to the caller at the end of the run.
    pub fn into_incident(self) -> Incident {
        self.incident
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
