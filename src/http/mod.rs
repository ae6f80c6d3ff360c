//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (bound by the lifecycle)
//!     → server.rs (accept loop, hyper http1, trace layer)
//!     → dispatcher.rs (admission decision)
//!         shed     → fixed status, empty body
//!         admitted → timeout + panic recovery → external handler router
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod server;

pub use dispatcher::{dispatch, shed_response, DispatchState};
pub use server::{CloseOutcome, HttpServer, ServerHandle};
