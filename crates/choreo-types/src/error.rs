use thiserror::Error;

/// Errors returned by an external collaborator call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("{0} unavailable")]
    Unavailable(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors from the decision service (planning, classification, hypothesis).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecisionError {
    #[error("decision service unavailable")]
    Unavailable,

    #[error("unparsable recommendation: {0}")]
    Unparsable(String),

    #[error("decision backend error: {0}")]
    Backend(String),
}
