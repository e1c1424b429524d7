// File: ./src/error.rs
// User-facing error taxonomy for the rate-change workflow.
//
// Local validation never reaches the network layer; `ConfigMissing` tells
// the embedding UI to redirect to its configuration screen instead of
// showing an inline error.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Local input validation failed; reported inline, no request is sent.
    #[error("{0}")]
    Validation(String),

    /// No server address (or config file) available. The caller should
    /// redirect to the configuration screen.
    #[error("Server address is not configured")]
    ConfigMissing,

    /// The backend rejected the request. `message` carries the most
    /// specific text extractable from the response body.
    #[error("Server error ({status}): {message}")]
    Http { status: u16, message: String },

    /// Transport-level failure (unreachable host, broken connection, or
    /// an unparseable success body).
    #[error("Network error: {0}")]
    Network(String),
}

impl WorkflowError {
    pub fn is_config_missing(&self) -> bool {
        matches!(self, Self::ConfigMissing)
    }
}
