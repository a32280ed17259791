//! Engine configuration types.
//!
//! `ChoreoConfig` represents the top-level `config.toml`. Every section and
//! field has a default, so an empty file (or no file) yields a working engine.

use serde::{Deserialize, Serialize};

use crate::collaborator::Capability;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoreoConfig {
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub playbook: PlaybookConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

// ---------------------------------------------------------------------------
// Feature flags
// ---------------------------------------------------------------------------

/// Capability toggles. A disabled capability is hidden from the decision
/// service and its steps are skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "enabled")]
    pub auto_ticketing: bool,
    #[serde(default = "enabled")]
    pub chat_notifications: bool,
    #[serde(default = "enabled")]
    pub documentation: bool,
    #[serde(default = "enabled")]
    pub change_analysis: bool,
}

fn enabled() -> bool {
    true
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            auto_ticketing: true,
            chat_notifications: true,
            documentation: true,
            change_analysis: true,
        }
    }
}

impl FeatureFlags {
    /// Whether `capability` may be used. Capabilities without a toggle are
    /// always enabled.
    pub fn is_enabled(&self, capability: Capability) -> bool {
        match capability {
            Capability::Ticketing => self.auto_ticketing,
            Capability::Chat => self.chat_notifications,
            Capability::Documentation => self.documentation,
            Capability::CodeHost => self.change_analysis,
            Capability::IssueTracker | Capability::Decision | Capability::Logging => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Actions whose failure is logged at error level. Failure never halts a run.
    #[serde(default = "default_critical_actions")]
    pub critical_actions: Vec<String>,
    /// Repository analyzed when a change-analysis step names none.
    #[serde(default = "default_repository")]
    pub default_repository: String,
    #[serde(default = "default_hours_back")]
    pub default_hours_back: u32,
    /// Largest single action payload kept in the run context; larger ones are
    /// replaced by a truncation marker.
    #[serde(default = "default_max_result_bytes")]
    pub max_result_bytes: usize,
    /// Total recorded payload size past which a run is aborted.
    #[serde(default = "default_max_context_bytes")]
    pub max_context_bytes: usize,
}

pub const DEFAULT_MAX_RESULT_BYTES: usize = 1_048_576;
pub const DEFAULT_MAX_CONTEXT_BYTES: usize = 10_485_760;

fn default_max_result_bytes() -> usize {
    DEFAULT_MAX_RESULT_BYTES
}

fn default_max_context_bytes() -> usize {
    DEFAULT_MAX_CONTEXT_BYTES
}

fn default_critical_actions() -> Vec<String> {
    vec!["create_ticket".to_string()]
}

fn default_repository() -> String {
    "acme/main-app".to_string()
}

fn default_hours_back() -> u32 {
    24
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            critical_actions: default_critical_actions(),
            default_repository: default_repository(),
            default_hours_back: default_hours_back(),
            max_result_bytes: default_max_result_bytes(),
            max_context_bytes: default_max_context_bytes(),
        }
    }
}

impl DispatchConfig {
    pub fn is_critical(&self, action: &str) -> bool {
        self.critical_actions.iter().any(|a| a == action)
    }
}

// ---------------------------------------------------------------------------
// Playbook
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookConfig {
    /// Shared channel that receives the initial alert broadcast.
    #[serde(default = "default_alert_channel")]
    pub alert_channel: String,
    /// Repositories inspected when the caller supplies none.
    #[serde(default = "default_repositories")]
    pub repositories: Vec<String>,
    #[serde(default = "default_deployment_environment")]
    pub deployment_environment: String,
    /// Wall-clock budget for a whole playbook run. Stages still pending when
    /// it runs out are not started and the run is reported unsuccessful.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

fn default_alert_channel() -> String {
    "#incident-response".to_string()
}

fn default_repositories() -> Vec<String> {
    vec![default_repository()]
}

fn default_deployment_environment() -> String {
    "production".to_string()
}

impl Default for PlaybookConfig {
    fn default() -> Self {
        Self {
            alert_channel: default_alert_channel(),
            repositories: default_repositories(),
            deployment_environment: default_deployment_environment(),
            deadline_ms: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Age after which a completed workflow may be evicted.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

fn default_max_entries() -> usize {
    1000
}

fn default_retention_secs() -> u64 {
    86_400
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            retention_secs: default_retention_secs(),
        }
    }
}
