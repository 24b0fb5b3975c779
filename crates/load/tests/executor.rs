//! Load runs against an in-process mock of the invoices search endpoint

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::task::JoinHandle;

use facturas_load::{Executor, LoadScenario, Summary};

const TOKEN: &str = "LOAD-TOKEN";

#[derive(Clone)]
struct Behaviour {
    status: StatusCode,
    delay: Duration,
    hits: Arc<AtomicU64>,
}

struct MockApi {
    base_url: String,
    hits: Arc<AtomicU64>,
    handle: JoinHandle<()>,
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn spawn_mock(status: StatusCode, delay: Duration) -> MockApi {
    let hits = Arc::new(AtomicU64::new(0));
    let behaviour = Behaviour {
        status,
        delay,
        hits: hits.clone(),
    };
    let app = Router::new()
        .route("/V1/invoices", get(search))
        .with_state(behaviour);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockApi {
        base_url: format!("http://{}", addr),
        hits,
        handle,
    }
}

async fn search(State(behaviour): State<Behaviour>, headers: HeaderMap) -> Response {
    behaviour.hits.fetch_add(1, Ordering::Relaxed);
    let authorized = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some(TOKEN);
    let json_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) == Some("application/json");
    if !authorized || !json_type {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Token inválido" }))).into_response();
    }

    tokio::time::sleep(behaviour.delay).await;
    if !behaviour.status.is_success() {
        return (behaviour.status, Json(json!({ "error": "boom" }))).into_response();
    }
    Json(json!({
        "invoices": [{ "id": 1, "invoice_number": "FAC-7081986", "status": "Vigente" }],
        "page": 1
    }))
    .into_response()
}

fn scenario(base_url: &str) -> LoadScenario {
    LoadScenario {
        base_url: base_url.to_string(),
        token: TOKEN.to_string(),
        duration: Duration::from_secs(1),
        think_time: Duration::from_millis(10),
        graceful_stop: Duration::from_secs(5),
        request_timeout: Duration::from_secs(5),
        ..LoadScenario::default()
    }
}

#[tokio::test]
async fn test_constant_rate_against_healthy_api() {
    let mock = spawn_mock(StatusCode::OK, Duration::ZERO).await;
    let executor = Executor::new(scenario(&mock.base_url)).unwrap();
    let outcome = executor.run().await;
    let snapshot = &outcome.snapshot;

    // 20 per second for one second
    assert!(
        (15..=21).contains(&snapshot.requests),
        "unexpected request count {}",
        snapshot.requests
    );
    assert_eq!(snapshot.requests, mock.hits.load(Ordering::Relaxed));
    assert_eq!(snapshot.failed_requests, 0);
    assert_eq!(snapshot.dropped_iterations, 0);
    assert_eq!(snapshot.interrupted_iterations, 0);
    assert_eq!(snapshot.iterations, snapshot.requests);
    assert!(snapshot.peak_vus >= 1);
    for check in &snapshot.checks {
        assert_eq!(check.fails, 0, "check {} failed", check.name);
        assert_eq!(check.passes, snapshot.requests);
    }

    let summary = Summary::new(executor.scenario(), &outcome);
    assert!(summary.stable);
    assert!(summary.latency_acceptable);
    assert!(summary.thresholds_passed);
    assert_eq!(summary.error_percent_text(), "0.00");
}

#[tokio::test]
async fn test_server_errors_cross_the_error_threshold() {
    let mock = spawn_mock(StatusCode::INTERNAL_SERVER_ERROR, Duration::ZERO).await;
    let mut scenario = scenario(&mock.base_url);
    scenario.duration = Duration::from_millis(500);
    let executor = Executor::new(scenario).unwrap();
    let outcome = executor.run().await;

    let snapshot = &outcome.snapshot;
    assert!(snapshot.requests > 0);
    assert_eq!(snapshot.failed_requests, snapshot.requests);
    assert_eq!(snapshot.checks[0].passes, 0);

    let summary = Summary::new(executor.scenario(), &outcome);
    assert!(!summary.stable);
    assert!(!summary.thresholds_passed);
    assert!(!summary.thresholds[0].passed);
    assert_eq!(summary.error_percent_text(), "100.00");
}

#[tokio::test]
async fn test_iterations_are_dropped_without_free_vus() {
    let mock = spawn_mock(StatusCode::OK, Duration::from_millis(300)).await;
    let mut scenario = scenario(&mock.base_url);
    scenario.duration = Duration::from_millis(500);
    scenario.pre_allocated_vus = 1;
    scenario.max_vus = 1;
    let executor = Executor::new(scenario).unwrap();
    let outcome = executor.run().await;

    let snapshot = &outcome.snapshot;
    assert_eq!(snapshot.peak_vus, 1);
    assert!(snapshot.dropped_iterations > 0);
    assert!(snapshot.requests <= 2);
    assert_eq!(snapshot.failed_requests, 0);
}

#[tokio::test]
async fn test_graceful_stop_interrupts_slow_iterations() {
    let mock = spawn_mock(StatusCode::OK, Duration::from_secs(3)).await;
    let mut scenario = scenario(&mock.base_url);
    scenario.rate = 5;
    scenario.duration = Duration::from_millis(300);
    scenario.graceful_stop = Duration::from_millis(100);
    let executor = Executor::new(scenario).unwrap();
    let outcome = executor.run().await;

    let snapshot = &outcome.snapshot;
    assert!(snapshot.interrupted_iterations > 0);
    assert_eq!(snapshot.requests, 0);
    assert!(outcome.elapsed < Duration::from_secs(2));

    let summary = Summary::new(executor.scenario(), &outcome);
    assert_eq!(summary.p95_text(), "N/A");
    assert!(!summary.latency_acceptable);
}
