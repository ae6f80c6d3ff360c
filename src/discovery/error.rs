//! Discovery error taxonomy.

/// Outcome of a failed registry call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    /// The registry could not be reached at all.
    #[error("registry unreachable: {0}")]
    Unreachable(String),
    /// The registry answered and refused the request.
    #[error("registry rejected request: {0}")]
    Rejected(String),
    /// The registry did not answer within the deadline.
    #[error("registry call timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl DiscoveryError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DiscoveryError::Unreachable(_) => "unreachable",
            DiscoveryError::Rejected(_) => "rejected",
            DiscoveryError::Timeout(_) => "timeout",
        }
    }

    /// Whether trying the same call again could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, DiscoveryError::Rejected(_))
    }
}
