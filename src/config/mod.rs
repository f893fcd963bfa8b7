//! Configuration module for Amaunator.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (port, bind address)
//! - Logging (level, optional file)
//! - The output sink
//! - Pipeline shutdown and retry timing
//! - Targets started at boot

mod app;
mod output;
mod validation;

pub use app::{AppConfig, LoggingConfig, PipelineConfig, ServerConfig};
pub use output::{NatsConfig, OutputConfig};
pub use validation::{ConfigError, expand_env_vars};

// Re-export constants
pub use app::{
    DEFAULT_CONFIG_PATH, DEFAULT_DRAIN_TIMEOUT, DEFAULT_ERROR_BACKOFF, DEFAULT_LOG_LEVEL,
    DEFAULT_PORT,
};
