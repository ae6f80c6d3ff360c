//! Service lifecycle orchestration.
//!
//! # Responsibilities
//! - Bind the listener and start serving (Created → Listening)
//! - Publish the service record (Listening → Published)
//! - On stop: unpublish once, then close the listener (→ Draining → Stopped)
//! - Keep the whole shutdown inside the configured grace period

use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::admission::AdmissionGate;
use crate::config::ServiceConfig;
use crate::discovery::{DiscoveryClient, DiscoveryError, Registry, RegistrationId, ServiceRecord};
use crate::http::{CloseOutcome, HttpServer, ServerHandle};
use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::phase::LifecyclePhase;
use crate::resilience::Backoff;

/// What happened during shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopReport {
    /// Outcome of the unpublish attempt, `None` if nothing was published.
    pub unpublish: Option<Result<(), DiscoveryError>>,
    /// How the listener was closed, `None` if it was never bound.
    pub listener: Option<CloseOutcome>,
}

/// Owns one running instance: its record, its listener and its phase.
pub struct ServiceLifecycle<R> {
    config: ServiceConfig,
    discovery: DiscoveryClient<R>,
    record: ServiceRecord,
    gate: AdmissionGate,
    /// Built at construction, consumed by `bind`.
    pending: Option<HttpServer>,
    server: Option<ServerHandle>,
    local_addr: Option<SocketAddr>,
    phase: watch::Sender<LifecyclePhase>,
}

impl<R: Registry> ServiceLifecycle<R> {
    /// Prepare a node that will serve `handler` and register with `registry`.
    pub fn new(config: ServiceConfig, registry: R, handler: Router) -> Self {
        let server = HttpServer::new(&config, handler);
        let gate = server.gate();
        let discovery = DiscoveryClient::new(registry, config.discovery.timeout());
        let record = ServiceRecord::from_identity(&config.service);
        let (phase, _) = watch::channel(LifecyclePhase::Created);

        Self {
            config,
            discovery,
            record,
            gate,
            pending: Some(server),
            server: None,
            local_addr: None,
            phase,
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        *self.phase.borrow()
    }

    /// Observe phase changes.
    pub fn subscribe_phase(&self) -> watch::Receiver<LifecyclePhase> {
        self.phase.subscribe()
    }

    /// The service record as currently known, registration included.
    pub fn record(&self) -> &ServiceRecord {
        &self.record
    }

    /// Address the listener was bound to, kept after stop.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn gate(&self) -> AdmissionGate {
        self.gate.clone()
    }

    /// Bind the listener and start serving.
    ///
    /// On failure the node stays `Created` and nothing is published.
    pub async fn bind(&mut self) -> Result<SocketAddr, LifecycleError> {
        self.require(LifecyclePhase::Created, "bind")?;

        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| LifecycleError::Bind {
                address: address.clone(),
                source,
            })?;

        let server = self.pending.take().ok_or(LifecycleError::InvalidPhase {
            operation: "bind",
            phase: self.phase(),
        })?;
        let handle = match server.spawn(listener) {
            Ok(handle) => handle,
            Err(source) => return Err(LifecycleError::Bind { address, source }),
        };

        let local_addr = handle.local_addr();
        self.record.port = local_addr.port();
        self.local_addr = Some(local_addr);
        self.server = Some(handle);
        self.advance(LifecyclePhase::Listening);

        tracing::info!(address = %local_addr, service = %self.record.name, "Listener bound");
        Ok(local_addr)
    }

    /// Publish the service record.
    ///
    /// Transient failures are retried up to `discovery.publish_attempts`
    /// times. If publishing ultimately fails the listener is torn down and
    /// the node ends `Stopped`.
    pub async fn publish(&mut self) -> Result<RegistrationId, LifecycleError> {
        self.require(LifecyclePhase::Listening, "publish")?;
        match self.publish_with_retry().await {
            Ok(id) => Ok(id),
            Err(e) => Err(self.abandon_startup(e).await),
        }
    }

    /// Bind, then publish.
    pub async fn start(&mut self) -> Result<RegistrationId, LifecycleError> {
        self.bind().await?;
        self.publish().await
    }

    /// Unpublish (if published) and close the listener.
    ///
    /// Never fails: an unreachable registry is logged and shutdown goes on.
    /// Calling it again after `Stopped` does nothing.
    pub async fn stop(&mut self) -> StopReport {
        let phase = self.phase();
        if phase.is_terminal() {
            return StopReport {
                unpublish: None,
                listener: None,
            };
        }
        if phase == LifecyclePhase::Created {
            self.pending = None;
            self.advance(LifecyclePhase::Stopped);
            return StopReport {
                unpublish: None,
                listener: None,
            };
        }
        self.drain().await
    }

    /// Start, wait for `shutdown`, stop.
    ///
    /// `shutdown` is watched from the moment the listener is up: if it fires
    /// while publish is still in flight, publishing is abandoned and the node
    /// drains without unpublishing.
    pub async fn run<F>(mut self, shutdown: F) -> Result<StopReport, LifecycleError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.bind().await?;

        let published = tokio::select! {
            biased;
            _ = &mut shutdown => None,
            outcome = self.publish_with_retry() => Some(outcome),
        };

        match published {
            None => {
                tracing::info!(service = %self.record.name, "Shutdown requested before publish completed");
                return Ok(self.stop().await);
            }
            Some(Err(e)) => return Err(self.abandon_startup(e).await),
            Some(Ok(_)) => {}
        }

        shutdown.await;
        tracing::info!(service = %self.record.name, "Shutdown requested");
        Ok(self.stop().await)
    }

    /// Listening → Published. Leaves the node untouched on failure, and on
    /// cancellation, since the record only changes once the id is in hand.
    async fn publish_with_retry(&mut self) -> Result<RegistrationId, DiscoveryError> {
        let attempts = self.config.discovery.publish_attempts.max(1);
        let backoff = Backoff::from_millis(
            self.config.discovery.retry_base_delay_ms,
            self.config.discovery.retry_max_delay_ms,
        );

        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = self.discovery.publish(&self.record).await.and_then(|published| {
                match published.registration.clone() {
                    Some(id) => Ok((published, id)),
                    None => Err(DiscoveryError::Rejected(
                        "registry returned no registration id".into(),
                    )),
                }
            });

            match outcome {
                Ok((published, id)) => {
                    self.record = published;
                    self.advance(LifecyclePhase::Published);
                    tracing::info!(
                        service = %self.record.name,
                        endpoint = %self.record.endpoint(),
                        registration = %id,
                        "Service published"
                    );
                    return Ok(id);
                }
                Err(e) if attempt < attempts && e.is_transient() => {
                    let delay = backoff.delay(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Publish failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, attempt, "Publish failed");
                    return Err(e);
                }
            }
        }
    }

    async fn abandon_startup(&mut self, e: DiscoveryError) -> LifecycleError {
        tracing::warn!(service = %self.record.name, "Closing listener after failed publish");
        self.drain().await;
        LifecycleError::Publish(e)
    }

    /// Draining → Stopped, bounded by the grace period.
    async fn drain(&mut self) -> StopReport {
        let started = Instant::now();
        let deadline = started + self.config.shutdown.grace();

        if self.phase() != LifecyclePhase::Draining {
            self.advance(LifecyclePhase::Draining);
        }

        // Taken before the call: whatever happens, it is never attempted twice.
        let unpublish = match self.record.registration.take() {
            Some(id) => Some(self.unpublish(id, deadline).await),
            None => None,
        };

        let listener = match self.server.take() {
            Some(server) => Some(server.close(deadline.saturating_duration_since(Instant::now())).await),
            None => None,
        };

        self.advance(LifecyclePhase::Stopped);
        tracing::info!(
            service = %self.record.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Service stopped"
        );

        StopReport {
            unpublish,
            listener,
        }
    }

    async fn unpublish(&self, id: RegistrationId, deadline: Instant) -> Result<(), DiscoveryError> {
        let budget = deadline.saturating_duration_since(Instant::now());
        let outcome = match tokio::time::timeout_at(deadline, self.discovery.unpublish(&id)).await {
            Ok(result) => result,
            Err(_) => Err(DiscoveryError::Timeout(budget)),
        };

        match &outcome {
            Ok(()) => tracing::info!(registration = %id, "Service unpublished"),
            Err(e) => tracing::warn!(
                registration = %id,
                error = %e,
                "Unpublish failed, continuing shutdown"
            ),
        }
        outcome
    }

    fn require(&self, expected: LifecyclePhase, operation: &'static str) -> Result<(), LifecycleError> {
        let phase = self.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(LifecycleError::InvalidPhase { operation, phase })
        }
    }

    fn advance(&self, next: LifecyclePhase) {
        let previous = self.phase();
        debug_assert!(
            previous.can_transition_to(next),
            "illegal lifecycle transition {} -> {}",
            previous,
            next
        );
        self.phase.send_replace(next);
        tracing::info!(from = %previous, to = %next, "Lifecycle transition");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::InMemoryRegistry;
    use axum::routing::get;
    use std::sync::Arc;

    fn config() -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.service.host = "127.0.0.1".into();
        config.service.port = 0;
        config.shutdown.grace_millis = 1000;
        config
    }

    fn handler() -> Router {
        Router::new().route("/serviceA/", get(|| async { "hello" }))
    }

    #[tokio::test]
    async fn test_happy_path_walks_every_phase() {
        let registry = Arc::new(InMemoryRegistry::new());
        let mut node = ServiceLifecycle::new(config(), Arc::clone(&registry), handler());
        let mut phases = node.subscribe_phase();
        assert_eq!(node.phase(), LifecyclePhase::Created);

        let addr = node.bind().await.unwrap();
        assert_eq!(*phases.borrow_and_update(), LifecyclePhase::Listening);
        assert_eq!(node.record().port, addr.port());
        assert_ne!(addr.port(), 0);

        node.publish().await.unwrap();
        assert_eq!(node.phase(), LifecyclePhase::Published);
        assert!(node.record().is_published());
        assert_eq!(registry.len(), 1);

        let report = node.stop().await;
        assert_eq!(report.unpublish, Some(Ok(())));
        assert_eq!(report.listener, Some(CloseOutcome::Drained));
        assert_eq!(node.phase(), LifecyclePhase::Stopped);
        assert!(!node.record().is_published());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_publish_before_bind_is_refused() {
        let mut node = ServiceLifecycle::new(config(), InMemoryRegistry::new(), handler());
        let err = node.publish().await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidPhase {
                operation: "publish",
                phase: LifecyclePhase::Created
            }
        ));
    }

    #[tokio::test]
    async fn test_stop_from_created_goes_straight_to_stopped() {
        let mut node = ServiceLifecycle::new(config(), InMemoryRegistry::new(), handler());
        let report = node.stop().await;
        assert_eq!(report, StopReport { unpublish: None, listener: None });
        assert_eq!(node.phase(), LifecyclePhase::Stopped);
        assert!(node.bind().await.is_err());
    }

    #[tokio::test]
    async fn test_rejected_record_stops_node() {
        let mut config = config();
        config.service.base_path = "no-slash".into();
        let mut node = ServiceLifecycle::new(config, InMemoryRegistry::new(), handler());

        let err = node.start().await.unwrap_err();
        assert!(matches!(err, LifecycleError::Publish(DiscoveryError::Rejected(_))));
        assert_eq!(node.phase(), LifecyclePhase::Stopped);
    }
}
