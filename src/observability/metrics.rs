//! Metrics collection and exposition.
//!
//! # Metrics
//! - `admission_in_flight` (gauge): requests currently holding a permit
//! - `requests_admitted_total` (counter): requests handed to the handler
//! - `requests_shed_total` (counter): requests answered with the shed status
//! - `discovery_operations_total` (counter): registry calls by
//!   `operation` and `outcome`
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every update is a no-op
//! - The Prometheus exporter is opt-in via configuration

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    metrics::describe_gauge!("admission_in_flight", "Requests currently admitted");
    metrics::describe_counter!("requests_admitted_total", "Requests passed to the handler");
    metrics::describe_counter!("requests_shed_total", "Requests rejected by admission control");
    metrics::describe_counter!("discovery_operations_total", "Registry calls by operation and outcome");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}
