//! Uniform result record for a dispatched action or playbook sub-action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one action against one collaborator.
///
/// When `success` is false, `error` carries the failure text and `data` is
/// absent. A skipped action (capability disabled) is successful with
/// `skipped == true` and no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub action: String,
    pub collaborator: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    pub timestamp: DateTime<Utc>,
}

impl ActionResult {
    pub fn ok(
        action: impl Into<String>,
        collaborator: impl Into<String>,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            success: true,
            action: action.into(),
            collaborator: collaborator.into(),
            message: message.into(),
            data: Some(data),
            error: None,
            skipped: false,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(
        action: impl Into<String>,
        collaborator: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let error = error.into();
        let action = action.into();
        Self {
            success: false,
            message: format!("{action} failed"),
            action,
            collaborator: collaborator.into(),
            data: None,
            error: Some(error),
            skipped: false,
            timestamp: Utc::now(),
        }
    }

    pub fn skipped(
        action: impl Into<String>,
        collaborator: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            action: action.into(),
            collaborator: collaborator.into(),
            message: reason.into(),
            data: None,
            error: None,
            skipped: true,
            timestamp: Utc::now(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    /// Read a string field from the data payload.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.as_ref()?.get(key)?.as_str()
    }
}
