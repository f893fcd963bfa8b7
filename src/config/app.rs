//! Application configuration structures.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::monitor::TargetSpec;

use super::output::OutputConfig;
use super::validation::ConfigError;

// =============================================================================
// Constants
// =============================================================================

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Default API port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default time allowed for the result queue to drain on shutdown.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default pause after a failed poll cycle.
pub const DEFAULT_ERROR_BACKOFF: Duration = crate::monitor::DEFAULT_ERROR_BACKOFF;

// =============================================================================
// Server Configuration
// =============================================================================

/// HTTP API server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 8000).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (default: "info"). `RUST_LOG` takes precedence.
    pub level: String,

    /// Optional log file; rotated daily.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// Result pipeline tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum wait for queued results during shutdown (default: 10s).
    #[serde(with = "humantime_serde")]
    pub drain_timeout: Duration,

    /// Pause after a failed poll cycle (default: 1s).
    #[serde(with = "humantime_serde")]
    pub error_backoff: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP API server configuration.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Output sink.
    pub output: OutputConfig,

    /// Result pipeline tuning.
    pub pipeline: PipelineConfig,

    /// Targets started at boot.
    pub targets: Vec<TargetSpec>,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Load configuration if the file exists.
    ///
    /// Returns `Ok(None)` when there is no file at `path`.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file exists but cannot be read, parsed,
    /// or validated.
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Option<Self>, ConfigError> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(content) => Self::from_yaml(&content).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse and validate a YAML document.
    ///
    /// # Errors
    /// Returns `ConfigError` if the document cannot be parsed or validated.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.output = config.output.expand_env();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate server bind address
        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid server bind address: '{}'",
                self.server.bind
            ))
        })?;

        // Validate server port
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server port must be non-zero".to_string(),
            ));
        }

        tracing_subscriber::EnvFilter::try_new(&self.logging.level).map_err(|e| {
            ConfigError::ValidationError(format!(
                "invalid log level '{}': {}",
                self.logging.level, e
            ))
        })?;

        self.output.validate()?;

        for (index, target) in self.targets.iter().enumerate() {
            target.validate().map_err(|e| {
                ConfigError::ValidationError(format!("targets[{index}]: {e}"))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::FileConfig;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
        assert_eq!(config.output, OutputConfig::default());
        assert_eq!(config.pipeline.drain_timeout, Duration::from_secs(10));
        assert_eq!(config.pipeline.error_backoff, Duration::from_secs(1));
        assert!(config.targets.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
server:
  bind: "127.0.0.1"
  port: 9000
logging:
  level: debug
output:
  type: file
  path: results.log
  backup_count: 2
pipeline:
  drain_timeout: 30s
  error_backoff: 500ms
targets:
  - name: demo
    interval: 5
    timeout: 2
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.output,
            OutputConfig::File(FileConfig::new("results.log").with_backup_count(2))
        );
        assert_eq!(config.pipeline.drain_timeout, Duration::from_secs(30));
        assert_eq!(config.pipeline.error_backoff, Duration::from_millis(500));
        assert_eq!(config.targets, vec![TargetSpec::new("demo", 5, 2)]);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        assert_eq!(AppConfig::from_yaml("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_config_validation_invalid_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_bind_address() {
        let mut config = AppConfig::default();
        config.server.bind = "not-an-ip".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("invalid server bind address")
        );
    }

    #[test]
    fn test_config_validation_invalid_target() {
        let mut config = AppConfig::default();
        config.targets.push(TargetSpec::new("slow", 2, 5));

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("targets[0]"));
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "amaunator=loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_optional_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AppConfig::load_optional(dir.path().join("absent.yaml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server:\n  port: 8123\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.server.port, 8123);
        assert_eq!(config.server.bind, "0.0.0.0");
    }
}
