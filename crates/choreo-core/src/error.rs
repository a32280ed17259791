//! Engine error types.
//!
//! `HandlerError` and `StageError` are contained at the dispatch and stage
//! boundaries and turned into failed results. `RunFault` is the only error
//! that aborts the remainder of a run.

use choreo_types::error::{CollaboratorError, DecisionError};

/// Fault raised by an action handler. Never escapes the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Decision(#[from] DecisionError),

    /// A prerequisite (channel, ticket id, roster) is not available yet.
    #[error("{0}")]
    MissingInput(String),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
}

/// Fault raised inside a playbook stage. Never escapes the stage.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Decision(#[from] DecisionError),

    #[error("stage panicked: {0}")]
    Panicked(String),
}

/// Top-level fault of a run. Aborts the remaining steps or stages.
#[derive(Debug, thiserror::Error)]
pub enum RunFault {
    #[error("total context size ({size} bytes) exceeds maximum ({max} bytes)")]
    ContextOverflow { size: usize, max: usize },

    #[error("run panicked outside a step boundary: {0}")]
    Panicked(String),
}

/// Extract a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
