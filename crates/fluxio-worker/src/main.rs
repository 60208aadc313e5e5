use std::sync::Arc;

use fluxio_core::Config;
use fluxio_worker::{CommandExecutor, TaskWorker, WorkerOptions};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "fluxio=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let provider = config.worker_cloud;
    if !config.is_configured(provider) {
        anyhow::bail!("WORKER_CLOUD is {} but that cloud is not configured", provider);
    }
    tracing::info!(provider = %provider, "Starting worker");

    let queue = fluxio_queue::create_queue(provider, &config).await?;
    let store = fluxio_db::create_store(provider, &config).await?;
    let storage = fluxio_storage::create_router(&config);
    let executor = Arc::new(CommandExecutor::new(config.ffmpeg_path.clone()));

    tokio::fs::create_dir_all(&config.work_dir).await?;

    let worker = TaskWorker::new(
        queue,
        store,
        storage,
        executor,
        WorkerOptions::from_config(&config),
    );

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(()).await;
    });

    worker.run(shutdown_rx).await;
    Ok(())
}

/// Listens for Ctrl+C (SIGINT) and SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }
}
