// tests/server_tests.rs
mod common;

use common::{coordinator, ScriptedProber};
use health_pinger::health::{ProbeOutcome, Scheduler, SweepCoordinator};
use health_pinger::metrics::MetricsRegistry;
use health_pinger::server::{builder::serve_listener, RequestHandler};
use health_pinger::status::StatusTable;
use hyper::{Body, Method, Request, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

const A: &str = "https://a.example.com";
const B: &str = "https://b.example.com";

async fn started_scheduler(prober: Arc<ScriptedProber>) -> Arc<Scheduler> {
    let scheduler = Arc::new(Scheduler::new(
        coordinator(&[A, B], prober),
        Duration::from_secs(600),
    ));
    scheduler.start().await;
    scheduler
}

async fn send(handler: &RequestHandler, method: Method, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    handler.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_interval_and_table() {
    let (prober, _entered) = ScriptedProber::responding();
    prober.set_outcome(B, ProbeOutcome::TimedOut);
    let handler = RequestHandler::new(started_scheduler(prober).await);

    let response = send(&handler, Method::GET, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(
        json_body(response).await,
        json!({
            "interval_minutes": 10,
            "apis": { A: "ok", B: "down" }
        })
    );
}

#[tokio::test]
async fn health_before_first_sweep_is_empty() {
    let (prober, _entered) = ScriptedProber::responding();
    let scheduler = Arc::new(Scheduler::new(
        coordinator(&[A], prober),
        Duration::from_secs(180),
    ));
    let handler = RequestHandler::new(scheduler);

    let body = json_body(send(&handler, Method::GET, "/health").await).await;
    assert_eq!(body, json!({ "interval_minutes": 3, "apis": {} }));
}

#[tokio::test]
async fn ping_forces_a_sweep_and_returns_the_refreshed_table() {
    let (prober, _entered) = ScriptedProber::responding();
    let scheduler = started_scheduler(prober.clone()).await;
    let handler = RequestHandler::new(scheduler.clone());

    prober.set_outcome(A, ProbeOutcome::Failed("connection reset".into()));

    let response = send(&handler, Method::POST, "/ping").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["apis"][A], "down");

    let response = send(&handler, Method::GET, "/ping").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(scheduler.coordinator().completed_sweeps(), 3);
    assert_eq!(prober.calls(), 6);
}

#[tokio::test]
async fn unknown_routes_and_methods_are_rejected() {
    let (prober, _entered) = ScriptedProber::responding();
    let handler = RequestHandler::new(started_scheduler(prober).await);

    let response = send(&handler, Method::GET, "/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let response = send(&handler, Method::DELETE, "/health").await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    // Metrics are not served unless configured.
    let response = send(&handler, Method::GET, "/metrics").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn preflight_requests_are_answered() {
    let (prober, _entered) = ScriptedProber::responding();
    let handler = RequestHandler::new(started_scheduler(prober).await);

    let response = send(&handler, Method::OPTIONS, "/ping").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()["access-control-allow-methods"], "*");
}

#[tokio::test]
async fn metrics_are_rendered_on_the_configured_path() {
    let (prober, _entered) = ScriptedProber::responding();
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let coordinator = Arc::new(SweepCoordinator::new(
        common::registry(&[A]),
        StatusTable::new(),
        prober,
        Some(metrics.collector()),
    ));
    let scheduler = Arc::new(Scheduler::new(coordinator, Duration::from_secs(600)));
    scheduler.start().await;

    let handler = RequestHandler::new(scheduler).with_metrics(metrics, "/internal/metrics");

    let response = send(&handler, Method::GET, "/internal/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(r#"pinger_sweeps_total{trigger="startup"} 1"#));
    assert!(text.contains(r#"pinger_endpoint_up{endpoint="https://a.example.com"} 1"#));

    let response = send(&handler, Method::GET, "/metrics").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn serves_over_tcp_until_shutdown() {
    let (prober, _entered) = ScriptedProber::responding();
    let handler = RequestHandler::new(started_scheduler(prober).await);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(serve_listener(listener, handler, async move {
        let _ = stop_rx.await;
    }));

    let body: Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["apis"][A], "ok");
    assert_eq!(body["interval_minutes"], 10);

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
