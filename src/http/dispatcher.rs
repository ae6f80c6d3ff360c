//! Request dispatch under admission control.
//!
//! # Responsibilities
//! - Ask the gate for a slot before the handler sees the request
//! - Shed with a fixed status and empty body when the gate is full
//! - Hold the permit while the handler runs; drop it on every exit path

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::admission::AdmissionGate;

/// State required by the dispatch middleware.
#[derive(Debug, Clone)]
pub struct DispatchState {
    pub gate: AdmissionGate,
    pub shed_status: StatusCode,
}

impl DispatchState {
    pub fn new(gate: AdmissionGate, shed_status: StatusCode) -> Self {
        Self { gate, shed_status }
    }
}

/// Middleware: admit and forward, or shed.
///
/// A shed request never reaches `next` and its body is never read.
pub async fn dispatch(
    State(state): State<DispatchState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(permit) = state.gate.try_admit() else {
        metrics::counter!("requests_shed_total").increment(1);
        tracing::debug!(
            method = %request.method(),
            path = %request.uri().path(),
            ceiling = state.gate.ceiling(),
            "Request shed"
        );
        return shed_response(state.shed_status);
    };

    metrics::counter!("requests_admitted_total").increment(1);

    // If the connection goes away, this future is dropped and so is the permit.
    let response = next.run(request).await;
    drop(permit);
    response
}

/// The fixed response sent to shed requests.
pub fn shed_response(status: StatusCode) -> Response {
    (status, Body::empty()).into_response()
}
