//! Self-registering service node.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                  SERVICE NODE                    │
//!   Client Request    │  ┌──────────┐   ┌────────────┐   ┌───────────┐   │
//!   ──────────────────┼─▶│ listener │──▶│ admission  │──▶│  handler  │   │
//!                     │  │  (axum)  │   │   gate     │   │ (external)│   │
//!                     │  └──────────┘   └─────┬──────┘   └───────────┘   │
//!   503 (shed)        │                       │ full                     │
//!   ◀─────────────────┼───────────────────────┘                          │
//!                     │                                                  │
//!                     │  ┌────────────────────────────────────────────┐  │
//!                     │  │ lifecycle: bind → publish … unpublish → close │
//!                     │  └──────────────────────┬─────────────────────┘  │
//!                     └─────────────────────────┼────────────────────────┘
//!                                               ▼
//!                                      discovery registry
//! ```

use axum::{routing::get, Json, Router};
use clap::Parser;
use std::path::PathBuf;
use url::Url;

use service_node::config::{load_config, ServiceConfig, ServiceIdentity};
use service_node::discovery::{HttpRegistry, InMemoryRegistry};
use service_node::lifecycle::{shutdown_signal, ServiceLifecycle, Shutdown};
use service_node::observability;

#[derive(Parser)]
#[command(name = "service-node")]
#[command(about = "HTTP service that registers itself with a discovery registry", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    observability::logging::init(&config.observability.log_level);

    tracing::info!(
        service = %config.service.name,
        bind_address = %config.bind_address(),
        base_path = %config.service.base_path,
        ceiling = config.admission.ceiling,
        grace_ms = config.shutdown.grace_millis,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        observability::metrics::init_metrics(addr)?;
    }

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    let handler = welcome_router(&config.service);

    let report = match config.discovery.registry_url.clone() {
        Some(registry_url) => {
            let registry_url: Url = registry_url.parse()?;
            let registry = HttpRegistry::new(registry_url, config.discovery.timeout())?;
            tracing::info!(registry = %registry.base_url(), "Using remote registry");
            ServiceLifecycle::new(config, registry, handler)
                .run(shutdown.signalled())
                .await?
        }
        None => {
            tracing::warn!("No registry_url configured, publishing to an in-process registry");
            ServiceLifecycle::new(config, InMemoryRegistry::new(), handler)
                .run(shutdown.signalled())
                .await?
        }
    };

    tracing::info!(?report, "Shutdown complete");
    Ok(())
}

/// Demo handler: greets callers under the configured base path.
fn welcome_router(identity: &ServiceIdentity) -> Router {
    let name = &identity.name;
    let mut greeting = serde_json::Map::new();
    greeting.insert(
        format!("{} result", name),
        serde_json::Value::String(format!("Welcome to {}", name)),
    );
    let body = serde_json::Value::Object(greeting);

    Router::new().route(
        &identity.base_path,
        get(move || {
            let body = body.clone();
            async move { Json(body) }
        }),
    )
}
