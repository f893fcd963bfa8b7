//! End-to-end shutdown tests: targets feed the file sink until the service
//! drains and stops.

use std::sync::Arc;
use std::time::Duration;

use amaunator::config::{OutputConfig, PipelineConfig};
use amaunator::metrics::MetricsCollector;
use amaunator::output::FileConfig;
use amaunator::{MonitorService, Poller, TargetDefinition, TargetSpec, create_sink};
use tempfile::tempdir;

/// Poller whose reading is the target's interval, so lines are attributable.
struct IntervalPoller;

#[async_trait::async_trait]
impl Poller for IntervalPoller {
    fn kind(&self) -> &str {
        "interval"
    }

    async fn poll(&self, target: &TargetDefinition) -> i64 {
        target.interval as i64
    }
}

#[tokio::test]
async fn test_shutdown_flushes_every_result_to_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("results.log");
    let output = OutputConfig::File(
        FileConfig::new(path.to_string_lossy()).with_format("{target_name} {value}"),
    );

    let service = MonitorService::start(
        Arc::new(IntervalPoller),
        create_sink(&output).unwrap(),
        Arc::new(MetricsCollector::new()),
        &PipelineConfig::default(),
    );
    service.create(TargetSpec::new("alpha", 1, 1)).unwrap();
    service.create(TargetSpec::new("beta", 1, 1)).unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;

    tokio::time::timeout(Duration::from_secs(15), service.shutdown(Duration::from_secs(10)))
        .await
        .expect("shutdown should not deadlock");

    let stats = service.stats();
    assert_eq!(stats.active_targets, 0);
    assert_eq!(stats.queue_size, 0);
    assert_eq!(stats.total_errors, 0);

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len() as u64, stats.processed_messages);
    assert!(lines.iter().any(|l| *l == "alpha 1"));
    assert!(lines.iter().any(|l| *l == "beta 1"));
}

#[tokio::test]
async fn test_shutdown_without_targets_returns_promptly() {
    let service = MonitorService::start(
        Arc::new(IntervalPoller),
        create_sink(&OutputConfig::default()).unwrap(),
        Arc::new(MetricsCollector::new()),
        &PipelineConfig::default(),
    );

    tokio::time::timeout(Duration::from_secs(2), service.shutdown(Duration::from_secs(10)))
        .await
        .expect("idle shutdown should be immediate");
    assert_eq!(service.stats().processed_messages, 0);
}
