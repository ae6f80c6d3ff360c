//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{routing::get, Router};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use service_node::config::ServiceConfig;
use service_node::discovery::{DiscoveryError, Registry, RegistrationId, ServiceRecord};

pub const BASE_PATH: &str = "/serviceA/";

/// Config bound to an ephemeral loopback port with short deadlines.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.service.name = "ServiceA".into();
    config.service.host = "127.0.0.1".into();
    config.service.port = 0;
    config.service.base_path = BASE_PATH.into();
    config.shutdown.grace_millis = 1000;
    config.discovery.timeout_millis = 500;
    config.discovery.retry_base_delay_ms = 10;
    config.discovery.retry_max_delay_ms = 50;
    config
}

/// One registry call as seen by [`FakeRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Publish(String),
    Unpublish(String),
    Lookup(String),
}

/// Scripted answer for a registry call.
#[derive(Debug, Clone)]
pub enum Outcome {
    Succeed(&'static str),
    Fail(DiscoveryError),
    Hang,
}

/// Registry that answers from a script and records every call.
///
/// Publish answers are consumed in order; once the script runs out every
/// publish succeeds with `abc123`.
#[derive(Debug)]
pub struct FakeRegistry {
    publish: Mutex<VecDeque<Outcome>>,
    unpublish: Mutex<Outcome>,
    calls: Mutex<Vec<Call>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self {
            publish: Mutex::new(VecDeque::new()),
            unpublish: Mutex::new(Outcome::Succeed("")),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_publish(self, outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        *self.publish.lock().unwrap() = outcomes.into_iter().collect();
        self
    }

    pub fn with_unpublish(self, outcome: Outcome) -> Self {
        *self.unpublish.lock().unwrap() = outcome;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn unpublish_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Unpublish(_)))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn publish(&self, record: &ServiceRecord) -> Result<RegistrationId, DiscoveryError> {
        self.record(Call::Publish(record.name.clone()));
        let outcome = self
            .publish
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Succeed("abc123"));
        match outcome {
            Outcome::Succeed(id) => Ok(RegistrationId::new(id).unwrap()),
            Outcome::Fail(e) => Err(e),
            Outcome::Hang => std::future::pending().await,
        }
    }

    async fn unpublish(&self, registration: &RegistrationId) -> Result<(), DiscoveryError> {
        self.record(Call::Unpublish(registration.to_string()));
        let outcome = self.unpublish.lock().unwrap().clone();
        match outcome {
            Outcome::Succeed(_) => Ok(()),
            Outcome::Fail(e) => Err(e),
            Outcome::Hang => std::future::pending().await,
        }
    }

    async fn lookup(&self, name: &str) -> Result<Vec<ServiceRecord>, DiscoveryError> {
        self.record(Call::Lookup(name.to_string()));
        Ok(Vec::new())
    }
}

/// Handler that answers "hello" at the base path.
pub fn hello_handler() -> Router {
    Router::new().route(BASE_PATH, get(|| async { "hello" }))
}

/// Handler that parks every request until `release` hands out a permit.
pub fn parked_handler(entered: Arc<AtomicUsize>, release: Arc<Semaphore>) -> Router {
    Router::new().route(
        BASE_PATH,
        get(move || {
            let entered = Arc::clone(&entered);
            let release = Arc::clone(&release);
            async move {
                entered.fetch_add(1, Ordering::SeqCst);
                if let Ok(permit) = release.acquire().await {
                    permit.forget();
                }
                "handled"
            }
        }),
    )
}

/// Poll `condition` until it holds or `deadline` passes.
pub async fn wait_until(deadline: Duration, condition: impl Fn() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// True if nothing accepts connections on `addr` any more.
pub async fn is_closed(addr: std::net::SocketAddr) -> bool {
    tokio::net::TcpStream::connect(addr).await.is_err()
}
