//! Self-registering HTTP service node.
//!
//! Serves an externally supplied handler behind a non-queuing admission
//! gate and keeps a discovery registry record in step with its listener.

pub mod admission;
pub mod config;
pub mod discovery;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use admission::{AdmissionGate, AdmissionPermit};
pub use config::ServiceConfig;
pub use discovery::{DiscoveryClient, DiscoveryError, Registry, RegistrationId, ServiceRecord};
pub use http::HttpServer;
pub use lifecycle::{LifecycleError, LifecyclePhase, ServiceLifecycle, Shutdown, StopReport};
