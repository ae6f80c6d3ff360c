//! Typed, deadline-bounded access to a discovery registry.

use futures_util::stream::{self, Stream, StreamExt};
use std::future::Future;
use std::time::Duration;

use crate::discovery::error::DiscoveryError;
use crate::discovery::record::{RegistrationId, ServiceRecord};
use crate::discovery::registry::Registry;

/// Wraps a [`Registry`] with a per-call deadline and typed outcomes.
///
/// Holds nothing but the registry handle; records are never cached and
/// failed calls are never retried here.
#[derive(Debug)]
pub struct DiscoveryClient<R> {
    registry: R,
    timeout: Duration,
}

impl<R: Registry> DiscoveryClient<R> {
    pub fn new(registry: R, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Register `record` and return it with its registration id filled in.
    pub async fn publish(&self, record: &ServiceRecord) -> Result<ServiceRecord, DiscoveryError> {
        let registration = self
            .bounded("publish", self.registry.publish(record))
            .await?;

        let mut published = record.clone();
        published.registration = Some(registration);
        Ok(published)
    }

    /// Remove the record stored under `registration`.
    pub async fn unpublish(&self, registration: &RegistrationId) -> Result<(), DiscoveryError> {
        self.bounded("unpublish", self.registry.unpublish(registration))
            .await
    }

    /// Membership of `name`. No I/O happens until the result is consumed,
    /// and every consumption queries the registry afresh.
    pub fn lookup(&self, name: impl Into<String>) -> Lookup<'_, R> {
        Lookup {
            client: self,
            name: name.into(),
        }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, DiscoveryError>>,
    ) -> Result<T, DiscoveryError> {
        let outcome = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DiscoveryError::Timeout(self.timeout)),
        };

        let label = match &outcome {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        metrics::counter!("discovery_operations_total", "operation" => operation, "outcome" => label)
            .increment(1);

        outcome
    }
}

/// A pending, restartable lookup.
///
/// Cloning is cheap and each clone queries independently.
#[derive(Debug)]
pub struct Lookup<'a, R> {
    client: &'a DiscoveryClient<R>,
    name: String,
}

impl<R> Clone for Lookup<'_, R> {
    fn clone(&self) -> Self {
        Self {
            client: self.client,
            name: self.name.clone(),
        }
    }
}

impl<'a, R: Registry> Lookup<'a, R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Query the registry and collect the current members.
    pub async fn records(&self) -> Result<Vec<ServiceRecord>, DiscoveryError> {
        self.client
            .bounded("lookup", self.client.registry.lookup(&self.name))
            .await
    }

    /// Query the registry and yield members one by one. A failed query
    /// yields a single error item.
    pub fn stream(self) -> impl Stream<Item = Result<ServiceRecord, DiscoveryError>> + 'a {
        stream::once(async move { self.records().await }).flat_map(|result| {
            let items: Vec<_> = match result {
                Ok(records) => records.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
            stream::iter(items)
        })
    }
}
