//! Vigil dashboard server
//!
//! Runs the monitors, the health analytics cycle and the composite state
//! broadcast, and serves them over REST and WebSocket.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vigil_lib::{clock::system_clock, observability::DashboardMetrics, StructuredLogger};
use vigil_server::{api, AppState, Pipeline, VigilConfig};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing first so configuration warnings are visible
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("VIGIL_LOG_FORMAT").unwrap_or_default();
    if log_format.eq_ignore_ascii_case("pretty") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    }

    info!("Starting vigil-server");

    let config = VigilConfig::load()?;

    let logger = StructuredLogger::default();
    let pipeline = Pipeline::build(&config, system_clock(), &logger);
    pipeline.health.register_pipeline().await;

    let metrics = DashboardMetrics::new();
    let app_state = Arc::new(
        AppState::new(pipeline.clone(), metrics).with_trusted_forwarding(config.trust_forwarded_for),
    );

    let scheduler = pipeline.spawn_tasks(&config);
    info!(tasks = ?scheduler.task_names(), "Periodic tasks started");

    let bind = config.bind_addr();
    logger.log_startup(SERVER_VERSION, &bind, pipeline.monitors.system.source_name());

    pipeline.health.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(bind, app_state));

    // Wait for shutdown signal
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            logger.log_shutdown("SIGINT received");
        }
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server exited"),
                Ok(Err(e)) => {
                    logger.log_shutdown("API server failed");
                    scheduler.shutdown().await;
                    return Err(e);
                }
                Err(e) => {
                    logger.log_shutdown("API server task failed");
                    scheduler.shutdown().await;
                    return Err(e.into());
                }
            }
        }
    }

    pipeline.health.set_ready(false).await;
    scheduler.shutdown().await;
    info!("Shutting down");

    Ok(())
}
