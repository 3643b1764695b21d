//! # Orders Service
//!
//! Runs the ingestion pipeline against PostgreSQL, Redis and pgmq until Ctrl-C or
//! until the pipeline stops on its own, then shuts down in order.

use anyhow::Context;
use orders_core::config::ConfigManager;
use orders_core::logging::init_structured_logging;
use orders_core::service::{Dependencies, OrdersService};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal outside development
    let _ = dotenvy::dotenv();
    init_structured_logging();

    let config = ConfigManager::load().context("failed to load configuration")?;
    info!(
        environment = %config.environment(),
        config = %config.debug_config(),
        "Configuration loaded"
    );

    let deps = Dependencies::connect(config.config())
        .await
        .context("failed to connect service dependencies")?;

    let service = OrdersService::start(deps, config.config()).await;
    info!(warmed = service.warmed_orders(), "Orders service running");

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        }
        _ = service.stopped() => {
            error!(state = %service.state(), "Ingestion pipeline stopped unexpectedly");
        }
    }

    let stats = service.stats().snapshot();
    service.shutdown().await.context("shutdown failed")?;
    info!(?stats, "Orders service stopped");
    Ok(())
}
