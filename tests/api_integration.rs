//! API Integration Tests for Amaunator
//!
//! Exercises every HTTP endpoint against a live server.

use std::sync::Arc;
use std::time::Duration;

use amaunator::config::PipelineConfig;
use amaunator::metrics::MetricsCollector;
use amaunator::output::ConsoleSink;
use amaunator::server::{AppState, create_router};
use amaunator::{MonitorService, Poller, TargetDefinition};
use axum::http::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpListener;

// =============================================================================
// Test Helpers
// =============================================================================

/// Poller that answers immediately with a fixed reading.
struct FixedPoller(i64);

#[async_trait::async_trait]
impl Poller for FixedPoller {
    fn kind(&self) -> &str {
        "fixed"
    }

    async fn poll(&self, _target: &TargetDefinition) -> i64 {
        self.0
    }
}

/// Create a service backed by the fixed poller and the console sink.
fn create_test_service() -> MonitorService {
    MonitorService::start(
        Arc::new(FixedPoller(7)),
        Box::new(ConsoleSink::default()),
        Arc::new(MetricsCollector::new()),
        &PipelineConfig::default(),
    )
}

/// Start test server and return base URL.
async fn start_test_server() -> (String, MonitorService) {
    let service = create_test_service();
    let router = create_router(AppState::new(service.clone()));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://{}", addr), service)
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let (base_url, service) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/healthz", base_url))
        .send()
        .await
        .expect("Failed to send healthz request");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("Failed to parse healthz response");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["accepting"], true);

    service.shutdown(Duration::from_secs(1)).await;
}

// =============================================================================
// Targets CRUD Tests
// =============================================================================

#[tokio::test]
async fn test_targets_crud() {
    let (base_url, service) = start_test_server().await;
    let client = reqwest::Client::new();

    // 1. Create target via POST /targets
    let resp = client
        .post(format!("{}/targets", base_url))
        .json(&json!({ "name": "edge-router", "interval": 1, "timeout": 1 }))
        .send()
        .await
        .expect("Failed to create target");
    assert_eq!(resp.status(), StatusCode::CREATED.as_u16());

    let created: Value = resp.json().await.expect("Failed to parse created target");
    assert_eq!(created["name"], "edge-router");
    assert_eq!(created["interval"], 1);
    assert_eq!(created["timeout"], 1);
    let id = created["id"].as_str().expect("id should be a string").to_string();

    // 2. List targets via GET /targets
    let resp = client
        .get(format!("{}/targets", base_url))
        .send()
        .await
        .expect("Failed to list targets");
    assert_eq!(resp.status(), 200);

    let targets: Vec<Value> = resp.json().await.expect("Failed to parse targets list");
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0]["id"], id.as_str());

    // 3. Wait for at least one sample, then GET /targets/{id}
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let resp = client
        .get(format!("{}/targets/{}", base_url, id))
        .send()
        .await
        .expect("Failed to get target");
    assert_eq!(resp.status(), 200);

    let target: Value = resp.json().await.expect("Failed to parse target");
    assert_eq!(target["name"], "edge-router");
    assert!(target["status"]["check_count"].as_u64().unwrap() >= 1);
    assert_eq!(target["status"]["error_count"], 0);
    assert_eq!(target["status"]["last_value"], 7);
    assert!(target["status"]["last_check"].is_string());

    // 4. Delete target via DELETE /targets/{id}
    let resp = client
        .delete(format!("{}/targets/{}", base_url, id))
        .send()
        .await
        .expect("Failed to delete target");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT.as_u16());

    // Verify deletion
    let resp = client
        .get(format!("{}/targets/{}", base_url, id))
        .send()
        .await
        .expect("Failed to verify deletion");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND.as_u16());

    service.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_target_not_found() {
    let (base_url, service) = start_test_server().await;
    let client = reqwest::Client::new();
    let id = uuid::Uuid::new_v4();

    // Test GET non-existent target
    let resp = client
        .get(format!("{}/targets/{}", base_url, id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND.as_u16());
    let body: Value = resp.json().await.expect("Failed to parse error body");
    assert_eq!(body["detail"], "Target not found");

    // Test DELETE non-existent target
    let resp = client
        .delete(format!("{}/targets/{}", base_url, id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND.as_u16());

    service.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_target_invalid_spec() {
    let (base_url, service) = start_test_server().await;
    let client = reqwest::Client::new();

    // interval shorter than timeout
    let resp = client
        .post(format!("{}/targets", base_url))
        .json(&json!({ "name": "slow", "interval": 2, "timeout": 5 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY.as_u16());

    // zero interval
    let resp = client
        .post(format!("{}/targets", base_url))
        .json(&json!({ "name": "zero", "interval": 0, "timeout": 0 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY.as_u16());

    // missing field
    let resp = client
        .post(format!("{}/targets", base_url))
        .json(&json!({ "name": "partial" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY.as_u16());

    // Nothing was registered
    let targets: Vec<Value> = client
        .get(format!("{}/targets", base_url))
        .send()
        .await
        .expect("Failed to list targets")
        .json()
        .await
        .expect("Failed to parse targets list");
    assert!(targets.is_empty());

    service.shutdown(Duration::from_secs(1)).await;
}

// =============================================================================
// Stats and Metrics Tests
// =============================================================================

#[tokio::test]
async fn test_stats_and_metrics() {
    let (base_url, service) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/targets", base_url))
        .json(&json!({ "name": "db", "interval": 1, "timeout": 1 }))
        .send()
        .await
        .expect("Failed to create target");
    assert_eq!(resp.status(), StatusCode::CREATED.as_u16());

    tokio::time::sleep(Duration::from_millis(1500)).await;

    // Test /stats
    let resp = client
        .get(format!("{}/stats", base_url))
        .send()
        .await
        .expect("Failed to fetch stats");
    assert_eq!(resp.status(), 200);
    let stats: Value = resp.json().await.expect("Failed to parse stats");
    assert_eq!(stats["active_targets"], 1);
    assert!(stats["processed_messages"].as_u64().unwrap() >= 1);
    assert_eq!(stats["total_errors"], 0);
    assert!(stats["uptime_seconds"].as_f64().unwrap() > 0.0);

    // Test /metrics
    let resp = client
        .get(format!("{}/metrics", base_url))
        .send()
        .await
        .expect("Failed to fetch metrics");
    assert_eq!(resp.status(), 200);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain; version=0.0.4"));

    let body = resp.text().await.expect("Failed to read metrics body");
    assert!(body.contains("amaunator_active_targets 1"));
    assert!(body.contains("# TYPE amaunator_processed_messages_total counter"));
    assert!(body.contains("amaunator_target_value{target_name=\"db\""));

    service.shutdown(Duration::from_secs(1)).await;
}
