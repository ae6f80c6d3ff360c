//! HTTP server setup and lifetime.
//!
//! # Responsibilities
//! - Wrap the externally supplied handler router with the dispatch middleware
//! - Wire up cross-cutting layers (tracing, timeout, panic recovery)
//! - Serve on an already bound listener, one tracked task per connection
//! - Close: stop accepting, drain within a deadline, then abort what is left

use axum::{http::StatusCode, middleware, Router};
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admission::AdmissionGate;
use crate::config::ServiceConfig;
use crate::http::dispatcher::{dispatch, DispatchState};

/// HTTP server for a service node, not yet serving.
pub struct HttpServer {
    app: Router,
    gate: AdmissionGate,
}

impl HttpServer {
    /// Wrap `handler` with admission control and the standard layers.
    pub fn new(config: &ServiceConfig, handler: Router) -> Self {
        let gate = AdmissionGate::new(config.admission.ceiling);
        let shed_status =
            StatusCode::from_u16(config.admission.shed_status).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
        let app = Self::build_router(config, handler, DispatchState::new(gate.clone(), shed_status));
        Self { app, gate }
    }

    /// Layer order, outermost first: trace → dispatch → timeout → catch-panic → handler.
    fn build_router(config: &ServiceConfig, handler: Router, state: DispatchState) -> Router {
        handler
            .layer(CatchPanicLayer::new())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.http.request_timeout_secs),
            ))
            .layer(middleware::from_fn_with_state(state, dispatch))
            .layer(TraceLayer::new_for_http())
    }

    /// The gate guarding this server.
    pub fn gate(&self) -> AdmissionGate {
        self.gate.clone()
    }

    /// Start serving on `listener` in a background task.
    pub fn spawn(self, listener: TcpListener) -> io::Result<ServerHandle> {
        let local_addr = listener.local_addr()?;
        let (stop_tx, stop_rx) = oneshot::channel();

        tracing::info!(address = %local_addr, ceiling = self.gate.ceiling(), "HTTP server starting");

        let task = tokio::spawn(serve(listener, self.app, stop_rx));

        Ok(ServerHandle {
            local_addr,
            stop: stop_tx,
            task,
        })
    }
}

/// Accept loop. Every connection task lives in one `JoinSet`, so a forced
/// close can abort them and wait until their handlers are dropped.
///
/// `stop` carries the drain deadline. A dropped sender means no grace.
/// Each connection is told to drain through a `watch` flip after the
/// listener is gone.
async fn serve(listener: TcpListener, app: Router, mut stop: oneshot::Receiver<Duration>) -> CloseOutcome {
    let (drain_tx, drain_rx) = watch::channel(false);
    let mut connections = JoinSet::new();

    let grace = loop {
        tokio::select! {
            grace = &mut stop => break grace.unwrap_or_default(),
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(peer_addr = %peer, "Connection accepted");
                    connections.spawn(serve_connection(stream, peer, app.clone(), drain_rx.clone()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    };

    drop(listener);
    let _ = drain_tx.send(true);

    let drained = tokio::time::timeout(grace, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    match drained {
        Ok(()) => CloseOutcome::Drained,
        Err(_) => {
            tracing::warn!(
                open_connections = connections.len(),
                grace_ms = grace.as_millis() as u64,
                "Drain deadline passed, aborting connections"
            );
            connections.shutdown().await;
            CloseOutcome::Forced
        }
    }
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, app: Router, mut drain: watch::Receiver<bool>) {
    let service = TowerToHyperService::new(app);
    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = drain.changed() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = result {
        tracing::debug!(peer_addr = %peer, error = %e, "Connection ended with error");
    }
}

/// How a running server was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// In-flight connections finished before the deadline.
    Drained,
    /// The deadline passed and the remaining connections were aborted.
    Forced,
}

/// A server that is accepting connections.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    stop: oneshot::Sender<Duration>,
    task: JoinHandle<CloseOutcome>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting and wait up to `grace` for in-flight requests.
    ///
    /// On return the listening socket is closed and no connection task is
    /// left running, whichever way it went.
    pub async fn close(self, grace: Duration) -> CloseOutcome {
        let _ = self.stop.send(grace);

        match self.task.await {
            Ok(outcome) => {
                tracing::info!(address = %self.local_addr, outcome = ?outcome, "HTTP server stopped");
                outcome
            }
            Err(e) => {
                tracing::error!(address = %self.local_addr, error = %e, "HTTP server task failed");
                CloseOutcome::Forced
            }
        }
    }
}
