//! Lifecycle error taxonomy.

use crate::discovery::DiscoveryError;
use crate::lifecycle::phase::LifecyclePhase;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The listener could not be bound. Nothing was published.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Publishing failed. The listener has been closed.
    #[error("failed to publish service record: {0}")]
    Publish(#[source] DiscoveryError),

    /// An operation was invoked in a phase that does not allow it.
    #[error("cannot {operation} while {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: LifecyclePhase,
    },
}
