//! Amaunator Binary Entry Point
//!
//! This binary runs the complete Amaunator polling daemon.
//! Core functionality is provided by the `amaunator` library crate.

use amaunator::{
    MonitorService, RandomPoller, create_sink,
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    logging::init_logging,
    metrics::MetricsCollector,
    server::{AppState, create_router},
};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;

/// Amaunator - Periodic Target Monitoring
#[derive(Parser, Debug)]
#[command(name = "amaunator", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (missing file means defaults)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = "AMAUNATOR_CONFIG")]
    config: String,

    /// Server bind address (overrides config file)
    #[arg(long, env = "AMAUNATOR_SERVER_BIND")]
    bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "AMAUNATOR_SERVER_PORT")]
    port: Option<u16>,

    /// Log level or filter directive (overrides config file)
    #[arg(long, env = "AMAUNATOR_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file
    let loaded = AppConfig::load_optional(&cli.config)?;
    let from_file = loaded.is_some();
    let mut config = loaded.unwrap_or_default();

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    // Initialize tracing; the guard flushes the log file on exit
    let _log_guard = init_logging(&config.logging)?;

    tracing::info!("Amaunator - Periodic Target Monitoring");
    if from_file {
        tracing::info!("Loaded configuration from: {}", cli.config);
    } else {
        tracing::info!("No configuration file at {}, using defaults", cli.config);
    }

    tracing::info!(
        "Server: {}:{}, Output: {}, Drain timeout: {}",
        config.server.bind,
        config.server.port,
        config.output.kind(),
        humantime::format_duration(config.pipeline.drain_timeout),
    );

    // Build the pipeline and start the consumer
    let metrics = Arc::new(MetricsCollector::new());
    let sink = create_sink(&config.output)?;
    let service = MonitorService::start(
        Arc::new(RandomPoller::new()),
        sink,
        Arc::clone(&metrics),
        &config.pipeline,
    );

    // Start configured targets
    for spec in &config.targets {
        match service.create(spec.clone()) {
            Ok(target) => {
                tracing::info!("Started configured target: {} ({})", target.name, target.id);
            }
            Err(e) => {
                tracing::error!("Failed to start configured target '{}': {}", spec.name, e);
            }
        }
    }

    // Build Axum router
    let app = create_router(AppState::new(service.clone()));

    // Parse bind address
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    tracing::info!("API server listening on: http://{}", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Server is down; stop producers, drain, then stop the consumer
    service.shutdown(config.pipeline.drain_timeout).await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
