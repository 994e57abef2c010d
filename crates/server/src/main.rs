mod bootstrap;
mod health;
pub mod notifications;
pub mod requests;
pub mod service;

use std::sync::Arc;

use anyhow::Result;

use staffdesk_core::config::{AppConfig, LoadOptions};
use staffdesk_core::workflow::TransitionEngine;
use staffdesk_db::repositories::{SqlNotificationRepository, SqlRequestRepository};

use crate::service::RequestService;

fn init_logging(config: &AppConfig) {
    use staffdesk_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let service = RequestService::new(
        Arc::new(SqlRequestRepository::new(app.db_pool.clone())),
        Arc::new(SqlNotificationRepository::new(app.db_pool.clone())),
        TransitionEngine::default(),
    );

    let router = requests::router(service.clone())
        .merge(notifications::router(service))
        .merge(health::router(app.db_pool.clone()));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "staffdesk-server started"
    );

    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "staffdesk-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
