use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Failures raised inside a single workflow action.
///
/// Every variant is caught at the action boundary and surfaced as a status
/// message; none of them terminate the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    /// Required input missing or out of range. Raised before any request is sent.
    #[error("{0}")]
    Validation(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl WorkflowError {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Short category label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Transport(_) => "transport",
            Self::Server { .. } => "server",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

impl From<reqwest::Error> for WorkflowError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
