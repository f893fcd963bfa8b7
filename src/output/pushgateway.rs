//! Prometheus Pushgateway sink.
//!
//! Each result replaces the `<namespace>_target_value` sample in a grouping
//! keyed by job and target id:
//! `POST {url}/metrics/job/{job}/target_id/{id}`.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::metrics::escape_label;
use crate::monitor::SampleResult;
use crate::output::{DEFAULT_FORMAT, OutputError, OutputSink, render_line};

/// Request timeout for a single push.
const PUSH_TIMEOUT: Duration = Duration::from_secs(5);

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

/// Configuration for the Pushgateway sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushgatewayConfig {
    /// Pushgateway base URL, e.g. `http://localhost:9091`.
    pub url: String,
    /// Job label for pushed groups.
    pub job: String,
    /// Line format, used for debug logging of each push.
    #[serde(default = "default_format")]
    pub format: String,
}

#[derive(Debug)]
pub struct PushgatewaySink {
    client: Client,
    base_url: String,
    config: PushgatewayConfig,
}

impl PushgatewaySink {
    pub fn new(config: PushgatewayConfig) -> Result<Self, OutputError> {
        if config.url.trim().is_empty() || config.job.trim().is_empty() {
            return Err(OutputError::Config(
                "pushgateway url and job are required".to_string(),
            ));
        }
        if !is_valid_job(&config.job) {
            return Err(OutputError::Config(format!(
                "pushgateway job '{}' may only contain letters, digits, '_', '-', '.' and ':'",
                config.job
            )));
        }
        let client = Client::builder().timeout(PUSH_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            config,
        })
    }

    fn push_url(&self, result: &SampleResult) -> String {
        format!(
            "{}/metrics/job/{}/target_id/{}",
            self.base_url, self.config.job, result.target_id
        )
    }
}

/// Whether `job` can be used verbatim as a URL path segment.
pub(crate) fn is_valid_job(job: &str) -> bool {
    !job.is_empty()
        && job
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

/// Render the exposition body for one reading.
pub(crate) fn render_body(result: &SampleResult, target_name: &str) -> String {
    format!(
        "# TYPE amaunator_target_value gauge\namaunator_target_value{{target_name=\"{}\"}} {}\n",
        escape_label(target_name),
        result.value
    )
}

#[async_trait::async_trait]
impl OutputSink for PushgatewaySink {
    fn kind(&self) -> &str {
        "prometheus"
    }

    async fn handle(
        &mut self,
        result: &SampleResult,
        target_name: &str,
    ) -> Result<(), OutputError> {
        let response = self
            .client
            .post(self.push_url(result))
            .header(reqwest::header::CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(render_body(result, target_name))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OutputError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(
            target_id = %result.target_id,
            line = %render_line(&self.config.format, result, target_name),
            "Pushed result"
        );
        Ok(())
    }
}
