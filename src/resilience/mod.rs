//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Publish attempt fails with a transient error
//!     → backoff.rs (exponential delay with jitter)
//!     → lifecycle retries while the listener is still up
//! ```
//!
//! # Design Decisions
//! - Retry policy lives with the caller that knows whether retrying still
//!   makes sense; clients below it never retry
//! - Jittered backoff prevents synchronized retries across instances

pub mod backoff;

pub use backoff::Backoff;
