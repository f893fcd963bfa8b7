//! Console sink: one formatted line per result on the log stream.

use serde::{Deserialize, Serialize};

use crate::monitor::SampleResult;
use crate::output::{DEFAULT_FORMAT, OutputError, OutputSink, render_line};

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

/// Configuration for the console sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Line format (default: `{timestamp} - {target_name} - {value}`).
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConsoleSink {
    config: ConsoleConfig,
}

impl ConsoleSink {
    pub fn new(config: ConsoleConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl OutputSink for ConsoleSink {
    fn kind(&self) -> &str {
        "console"
    }

    async fn handle(
        &mut self,
        result: &SampleResult,
        target_name: &str,
    ) -> Result<(), OutputError> {
        let line = render_line(&self.config.format, result, target_name);
        if result.is_error() {
            tracing::warn!(target: "amaunator::output", target_id = %result.target_id, "{}", line);
        } else {
            tracing::info!(target: "amaunator::output", target_id = %result.target_id, "{}", line);
        }
        Ok(())
    }
}
