//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a service node.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for a service node.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Identity and listen address of this instance.
    pub service: ServiceIdentity,

    /// Admission control (load shedding) settings.
    pub admission: AdmissionConfig,

    /// Shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Discovery registry settings.
    pub discovery: DiscoveryConfig,

    /// HTTP layer settings.
    pub http: HttpConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ServiceConfig {
    /// Address string the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.host, self.service.port)
    }
}

/// Service identity, published to the registry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceIdentity {
    /// Logical service name (e.g., "ServiceA").
    pub name: String,

    /// Host the listener binds to and advertises.
    pub host: String,

    /// Port to listen on. 0 picks an ephemeral port.
    pub port: u16,

    /// Base path the service answers under (e.g., "/serviceA/").
    pub base_path: String,
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self {
            name: "ServiceA".to_string(),
            host: "localhost".to_string(),
            port: 9080,
            base_path: "/serviceA/".to_string(),
        }
    }
}

/// Admission control configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Maximum number of requests handled concurrently.
    pub ceiling: usize,

    /// Status code returned to shed requests.
    pub shed_status: u16,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            ceiling: 256,
            shed_status: 503,
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Total budget for unpublish plus listener drain, in milliseconds.
    pub grace_millis: u64,
}

impl ShutdownConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_millis)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_millis: 5000 }
    }
}

/// Discovery registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Base URL of a remote registry. When absent an in-process registry is used.
    pub registry_url: Option<String>,

    /// Deadline for a single registry call in milliseconds.
    pub timeout_millis: u64,

    /// Number of publish attempts before startup is abandoned.
    pub publish_attempts: u32,

    /// Base delay for exponential backoff between publish attempts.
    pub retry_base_delay_ms: u64,

    /// Maximum delay between publish attempts.
    pub retry_max_delay_ms: u64,
}

impl DiscoveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            registry_url: None,
            timeout_millis: 2000,
            publish_attempts: 1,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 2000,
        }
    }
}

/// HTTP layer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
