//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (service.rs):
//!     Bind listener → start serving → publish record
//!     publish failed → Draining → close listener → Stopped
//!
//! Shutdown (service.rs, shutdown.rs):
//!     Signal received → Draining → unpublish (once) → close listener → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: listener first, then publish
//! - Ordered shutdown: unpublish before the socket closes
//! - Shutdown has a deadline: the listener is forced closed after the grace period

pub mod error;
pub mod phase;
pub mod service;
pub mod shutdown;
pub mod signals;

pub use error::LifecycleError;
pub use phase::LifecyclePhase;
pub use service::{ServiceLifecycle, StopReport};
pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
