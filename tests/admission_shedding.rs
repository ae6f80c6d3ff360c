//! Admission control seen from an HTTP client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use axum::{routing::get, Router};
use reqwest::StatusCode;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use service_node::ServiceLifecycle;

mod common;

use common::{FakeRegistry, BASE_PATH};

/// Fire `ceiling + 1` requests at a node whose handler parks, and check
/// exactly one is shed while the rest are served once released.
async fn burst_of_one_over_ceiling(ceiling: usize) {
    let mut config = common::test_config();
    config.admission.ceiling = ceiling;
    config.admission.shed_status = 503;

    let entered = Arc::new(AtomicUsize::new(0));
    let release = Arc::new(Semaphore::new(0));
    let mut node = ServiceLifecycle::new(
        config,
        FakeRegistry::new().shared(),
        common::parked_handler(Arc::clone(&entered), Arc::clone(&release)),
    );
    node.start().await.unwrap();
    let gate = node.gate();
    let url = format!("http://{}{}", node.local_addr().unwrap(), BASE_PATH);

    let client = reqwest::Client::new();
    let mut requests = JoinSet::new();
    for _ in 0..=ceiling {
        let client = client.clone();
        let url = url.clone();
        requests.spawn(async move {
            let response = client.get(url).send().await.unwrap();
            let status = response.status();
            (status, response.text().await.unwrap())
        });
    }

    // Admitted requests are parked, so the only one that can finish is the shed one.
    let (status, body) = tokio::time::timeout(Duration::from_secs(5), requests.join_next())
        .await
        .expect("shed response arrives while the others are parked")
        .unwrap()
        .unwrap();
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.is_empty());

    assert!(common::wait_until(Duration::from_secs(2), || entered.load(Ordering::SeqCst) == ceiling).await);
    assert_eq!(gate.in_flight(), ceiling);

    release.add_permits(ceiling);
    let mut served = 0;
    while let Some(result) = requests.join_next().await {
        let (status, body) = result.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "handled");
        served += 1;
    }

    assert_eq!(served, ceiling);
    assert_eq!(entered.load(Ordering::SeqCst), ceiling, "shed request never reached the handler");
    assert_eq!(gate.in_flight(), 0);

    node.stop().await;
}

#[tokio::test]
async fn test_ceiling_two_three_simultaneous_requests() {
    burst_of_one_over_ceiling(2).await;
}

#[tokio::test]
async fn test_ceiling_five_six_simultaneous_requests() {
    burst_of_one_over_ceiling(5).await;
}

#[tokio::test]
async fn test_configured_shed_status_is_used() {
    let mut config = common::test_config();
    config.admission.ceiling = 1;
    config.admission.shed_status = 429;

    let entered = Arc::new(AtomicUsize::new(0));
    let release = Arc::new(Semaphore::new(0));
    let mut node = ServiceLifecycle::new(
        config,
        FakeRegistry::new().shared(),
        common::parked_handler(Arc::clone(&entered), Arc::clone(&release)),
    );
    node.start().await.unwrap();
    let url = format!("http://{}{}", node.local_addr().unwrap(), BASE_PATH);

    let parked = tokio::spawn({
        let url = url.clone();
        async move { reqwest::get(url).await.unwrap().status() }
    });
    assert!(common::wait_until(Duration::from_secs(2), || entered.load(Ordering::SeqCst) == 1).await);

    let shed = reqwest::get(&url).await.unwrap();
    assert_eq!(shed.status(), StatusCode::TOO_MANY_REQUESTS);

    release.add_permits(1);
    assert_eq!(parked.await.unwrap(), StatusCode::OK);
    node.stop().await;
}

async fn panicking_handler() -> &'static str {
    panic!("handler panicked")
}

#[tokio::test]
async fn test_failing_handlers_give_their_slot_back() {
    let mut config = common::test_config();
    config.admission.ceiling = 1;

    let handler = Router::new()
        .route("/panic", get(panicking_handler))
        .route(
            "/error",
            get(|| async { Err::<&'static str, _>(axum::http::StatusCode::BAD_GATEWAY) }),
        )
        .route(BASE_PATH, get(|| async { "hello" }));

    let mut node = ServiceLifecycle::new(config, FakeRegistry::new().shared(), handler);
    node.start().await.unwrap();
    let gate = node.gate();
    let base = format!("http://{}", node.local_addr().unwrap());
    let client = reqwest::Client::new();

    for _ in 0..3 {
        let panicked = client.get(format!("{}/panic", base)).send().await.unwrap();
        assert_eq!(panicked.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(gate.in_flight(), 0);

        let errored = client.get(format!("{}/error", base)).send().await.unwrap();
        assert_eq!(errored.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(gate.in_flight(), 0);
    }

    // With a ceiling of one, any leaked permit would shed this.
    let ok = client.get(format!("{}{}", base, BASE_PATH)).send().await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(gate.in_flight(), 0);

    node.stop().await;
}
