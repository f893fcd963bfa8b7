//! Output Layer
//!
//! Destinations for processed results. The pipeline consumer owns exactly one
//! sink and calls it sequentially, one result at a time.
//!
//! - [`ConsoleSink`]: Line per result on the log stream
//! - [`FileSink`]: Line per result in a size-rotated file
//! - [`PushgatewaySink`]: Pushes each reading to a Prometheus Pushgateway
//! - [`create_sink`]: Builds the sink selected by configuration

mod console;
mod file;
mod pushgateway;

use thiserror::Error;

use crate::config::OutputConfig;
use crate::monitor::SampleResult;

pub use console::{ConsoleConfig, ConsoleSink};
pub use file::{DEFAULT_BACKUP_COUNT, DEFAULT_MAX_BYTES, FileConfig, FileSink};
pub use pushgateway::{PushgatewayConfig, PushgatewaySink};
pub(crate) use pushgateway::is_valid_job;

/// Default line format shared by all sinks.
pub const DEFAULT_FORMAT: &str = "{timestamp} - {target_name} - {value}";

/// Timestamp layout used by `{timestamp}`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors raised while delivering a result.
#[derive(Debug, Error)]
pub enum OutputError {
    /// File I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote endpoint rejected the push.
    #[error("push rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Sink configuration is unusable.
    #[error("config error: {0}")]
    Config(String),
}

/// Destination for processed results.
///
/// Called by the single pipeline consumer, so implementations may assume
/// exclusive, sequential access.
#[async_trait::async_trait]
pub trait OutputSink: Send + 'static {
    /// Sink kind, used in logs.
    fn kind(&self) -> &str;

    /// Deliver one result.
    async fn handle(&mut self, result: &SampleResult, target_name: &str)
    -> Result<(), OutputError>;
}

/// Render a result with a format string.
///
/// Supported placeholders: `{timestamp}`, `{target_name}`, `{target_id}`, `{value}`.
pub fn render_line(format: &str, result: &SampleResult, target_name: &str) -> String {
    let timestamp = result
        .timestamp
        .with_timezone(&chrono::Local)
        .format(TIMESTAMP_FORMAT)
        .to_string();

    static PLACEHOLDER_REGEX: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let regex = PLACEHOLDER_REGEX.get_or_init(|| {
        regex::Regex::new(r"\{(timestamp|target_name|target_id|value)\}")
            .expect("failed to compile placeholder regex")
    });

    // Single pass, so placeholders inside substituted values stay literal.
    regex
        .replace_all(format, |caps: &regex::Captures| match &caps[1] {
            "timestamp" => timestamp.clone(),
            "target_name" => target_name.to_string(),
            "target_id" => result.target_id.to_string(),
            _ => result.value.to_string(),
        })
        .into_owned()
}

/// Build the sink selected by configuration.
///
/// The `nats` kind has no client in this build and falls back to the console sink.
///
/// # Errors
/// Returns `OutputError` if the selected sink cannot be initialized.
pub fn create_sink(config: &OutputConfig) -> Result<Box<dyn OutputSink>, OutputError> {
    let sink: Box<dyn OutputSink> = match config {
        OutputConfig::Console(cfg) => Box::new(ConsoleSink::new(cfg.clone())),
        OutputConfig::File(cfg) => Box::new(FileSink::new(cfg.clone())?),
        OutputConfig::Prometheus(cfg) => Box::new(PushgatewaySink::new(cfg.clone())?),
        OutputConfig::Nats(cfg) => {
            tracing::warn!(
                url = %cfg.url,
                subject = %cfg.subject,
                "NATS output is not available, falling back to console"
            );
            Box::new(ConsoleSink::new(ConsoleConfig {
                format: cfg.format.clone(),
            }))
        }
    };
    tracing::info!(sink = sink.kind(), "Output sink created");
    Ok(sink)
}
