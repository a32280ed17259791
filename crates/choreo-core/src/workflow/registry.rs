//! In-memory workflow registry with bounded retention.
//!
//! Maps workflow id to the latest snapshot of that workflow. Each entry is
//! written only by its owning run; readers get clones. Completed workflows
//! are evicted by age and then by count; running workflows are never evicted.

use chrono::{DateTime, Duration, Utc};
use choreo_types::config::RegistryConfig;
use choreo_types::workflow::Workflow;
use dashmap::DashMap;
use uuid::Uuid;

/// Shared registry of workflow snapshots.
pub struct WorkflowRegistry {
    entries: DashMap<Uuid, Workflow>,
    config: RegistryConfig,
}

impl WorkflowRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    /// Register a new workflow, evicting stale entries first.
    pub fn register(&self, workflow: &Workflow) {
        self.entries.insert(workflow.id, workflow.clone());
        let evicted = self.evict(Utc::now());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.entries.len(), "evicted workflows");
        }
    }

    /// Replace the stored snapshot of a workflow.
    pub fn update(&self, workflow: &Workflow) {
        self.entries.insert(workflow.id, workflow.clone());
    }

    pub fn get(&self, id: Uuid) -> Option<Workflow> {
        self.entries.get(&id).map(|entry| entry.value().clone())
    }

    /// All workflows, oldest first.
    pub fn list(&self) -> Vec<Workflow> {
        let mut all: Vec<Workflow> = self.entries.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|w| (w.created_at, w.id));
        all
    }

    /// Workflows run for a given incident, oldest first.
    pub fn find_by_incident(&self, incident_id: Uuid) -> Vec<Workflow> {
        let mut found: Vec<Workflow> = self
            .entries
            .iter()
            .filter(|e| e.value().incident_id == incident_id)
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|w| (w.created_at, w.id));
        found
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop completed workflows older than the retention period, then the
    /// oldest completed workflows until the registry fits `max_entries`.
    /// Returns how many entries were removed.
    pub fn evict(&self, now: DateTime<Utc>) -> usize {
        let retention = i64::try_from(self.config.retention_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        let cutoff = now.checked_sub_signed(retention).unwrap_or(DateTime::<Utc>::MIN_UTC);

        // (finished_at, id) of every terminal workflow.
        let mut terminal: Vec<(DateTime<Utc>, Uuid)> = self
            .entries
            .iter()
            .filter(|e| e.value().is_terminal())
            .map(|e| {
                let w = e.value();
                (w.completed_at.unwrap_or(w.created_at), w.id)
            })
            .collect();
        terminal.sort();

        let mut removed = 0;
        let mut remaining = Vec::with_capacity(terminal.len());
        for (finished_at, id) in terminal {
            if finished_at < cutoff {
                if self.entries.remove(&id).is_some() {
                    removed += 1;
                }
            } else {
                remaining.push(id);
            }
        }

        for id in remaining {
            if self.entries.len() <= self.config.max_entries {
                break;
            }
            if self.entries.remove(&id).is_some() {
                removed += 1;
            }
        }
        removed
    }
}
