//! Output sink selection.
//!
//! The `output` section is tagged by `type`:
//!
//! ```yaml
//! output:
//!   type: file
//!   path: /var/log/amaunator/results.log
//!   max_bytes: 10485760
//!   backup_count: 5
//! ```

use serde::{Deserialize, Serialize};

use crate::output::{ConsoleConfig, DEFAULT_FORMAT, FileConfig, PushgatewayConfig, is_valid_job};

use super::validation::{ConfigError, expand_env_vars, require_non_empty};

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

/// NATS publisher settings.
///
/// Accepted so existing configuration files load, but results are written
/// through the console sink until a NATS client is wired in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatsConfig {
    /// Server URL, e.g. `nats://localhost:4222`.
    pub url: String,
    /// Subject results would be published on.
    pub subject: String,
    #[serde(default = "default_format")]
    pub format: String,
}

/// Single configured output sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputConfig {
    Console(ConsoleConfig),
    File(FileConfig),
    Nats(NatsConfig),
    Prometheus(PushgatewayConfig),
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::Console(ConsoleConfig::default())
    }
}

impl OutputConfig {
    /// Configured sink type name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Console(_) => "console",
            Self::File(_) => "file",
            Self::Nats(_) => "nats",
            Self::Prometheus(_) => "prometheus",
        }
    }

    /// Expand `${VAR}` references in URLs.
    pub fn expand_env(mut self) -> Self {
        match &mut self {
            Self::Nats(cfg) => cfg.url = expand_env_vars(&cfg.url),
            Self::Prometheus(cfg) => cfg.url = expand_env_vars(&cfg.url),
            Self::Console(_) | Self::File(_) => {}
        }
        self
    }

    /// Validate sink-specific settings.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if a required field is blank or
    /// the file rotation threshold is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Console(_) => Ok(()),
            Self::File(cfg) => {
                require_non_empty("output.path", &cfg.path)?;
                if cfg.max_bytes == 0 {
                    return Err(ConfigError::ValidationError(
                        "output.max_bytes must be positive".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Nats(cfg) => {
                require_non_empty("output.url", &cfg.url)?;
                require_non_empty("output.subject", &cfg.subject)
            }
            Self::Prometheus(cfg) => {
                require_non_empty("output.url", &cfg.url)?;
                require_non_empty("output.job", &cfg.job)?;
                if !is_valid_job(&cfg.job) {
                    return Err(ConfigError::ValidationError(format!(
                        "output.job '{}' may only contain letters, digits, '_', '-', '.' and ':'",
                        cfg.job
                    )));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{DEFAULT_BACKUP_COUNT, DEFAULT_MAX_BYTES};

    #[test]
    fn test_default_is_console() {
        let config = OutputConfig::default();
        assert_eq!(config.kind(), "console");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_file_output_with_defaults() {
        let config: OutputConfig = serde_yaml::from_str("type: file\npath: out.log\n").unwrap();
        let OutputConfig::File(file) = config else {
            panic!("expected file output");
        };
        assert_eq!(file.path, "out.log");
        assert_eq!(file.format, DEFAULT_FORMAT);
        assert_eq!(file.max_bytes, DEFAULT_MAX_BYTES);
        assert_eq!(file.backup_count, DEFAULT_BACKUP_COUNT);
    }

    #[test]
    fn test_parse_prometheus_output() {
        let yaml = "type: prometheus\nurl: http://gw:9091\njob: amaunator\n";
        let config: OutputConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.kind(), "prometheus");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(serde_yaml::from_str::<OutputConfig>("type: kafka\n").is_err());
    }

    #[test]
    fn test_nats_requires_subject() {
        let config = OutputConfig::Nats(NatsConfig {
            url: "nats://localhost:4222".to_string(),
            subject: String::new(),
            format: default_format(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_prometheus_rejects_job_with_slash() {
        let yaml = "type: prometheus\nurl: http://gw:9091\njob: team/amaunator\n";
        let config: OutputConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output.job"));
    }

    #[test]
    fn test_file_rejects_zero_max_bytes() {
        let config = OutputConfig::File(FileConfig::new("out.log").with_max_bytes(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expand_env_in_url() {
        let config = OutputConfig::Prometheus(PushgatewayConfig {
            url: "http://${AMAUNATOR_UNSET_GW_HOST:-gw}:9091".to_string(),
            job: "j".to_string(),
            format: default_format(),
        })
        .expand_env();
        let OutputConfig::Prometheus(cfg) = config else {
            panic!("expected prometheus output");
        };
        assert_eq!(cfg.url, "http://gw:9091");
    }
}
