//! Service discovery subsystem.
//!
//! # Data Flow
//! ```text
//! ServiceLifecycle
//!     → client.rs (deadline per call, typed outcome, metrics)
//!     → registry.rs (Registry trait: publish / unpublish / lookup)
//!         → http.rs   (remote registry, JSON over HTTP)
//!         → memory.rs (in-process registry)
//! ```
//!
//! # Design Decisions
//! - The client is stateless beyond its registry handle; no caching
//! - Failures are reported, never retried here; retry is the lifecycle's call
//! - `unpublish` takes a `RegistrationId`, so it cannot be issued for a
//!   record that was never published

pub mod client;
pub mod error;
pub mod http;
pub mod memory;
pub mod record;
pub mod registry;

pub use client::{DiscoveryClient, Lookup};
pub use error::DiscoveryError;
pub use http::HttpRegistry;
pub use memory::InMemoryRegistry;
pub use record::{RegistrationId, ServiceRecord};
pub use registry::Registry;
