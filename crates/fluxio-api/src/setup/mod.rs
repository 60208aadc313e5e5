//! Application setup and initialization
//!
//! All initialization logic lives here rather than in main.rs: telemetry,
//! capability routers, state, and the router itself.

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use fluxio_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry()?;
    tracing::info!("Configuration loaded and validated successfully");

    let storage = fluxio_storage::create_router(&config);
    let queues = fluxio_queue::create_queue_router(&config)
        .await
        .context("Queue setup failed")?;
    let stores = fluxio_db::create_store_router(&config)
        .await
        .context("Task table setup failed")?;

    let state = Arc::new(AppState {
        config: config.clone(),
        storage,
        queues,
        stores,
    });

    let router = routes::setup_routes(&config, state.clone());
    Ok((state, router))
}
