mod backends;
mod config;
mod db;
mod discovery;
mod error;
mod handlers;
mod models;
mod notify;
mod queue;
mod services;
mod storage;
mod workers;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::backends::Backends;
use crate::config::Config;
use crate::discovery::ZoneDiscovery;
use crate::notify::Notifier;
use crate::services::{ImageCatalog, UploadPipeline};
use crate::workers::RelayWorker;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<UploadPipeline>,
    pub catalog: Arc<ImageCatalog>,
    pub notifier: Arc<dyn Notifier>,
    pub discovery: Arc<ZoneDiscovery>,
}

impl AppState {
    pub fn new(config: Config, backends: Backends) -> Result<Self> {
        let pipeline = UploadPipeline::new(
            backends.object_store.clone(),
            backends.metadata.clone(),
            backends.queue.clone(),
            config.upload.on_conflict,
        );
        let catalog = ImageCatalog::new(backends.object_store, backends.metadata);
        let discovery =
            ZoneDiscovery::new(&config.discovery).context("Failed to build metadata client")?;

        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            catalog: Arc::new(catalog),
            notifier: backends.notifier,
            discovery: Arc::new(discovery),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    shared::observability::init_logging(config.logging.to_log_config()?)
        .context("Failed to initialize logging")?;

    info!("Starting Image Service...");
    config.validate().context("Invalid configuration")?;
    info!(
        "Configuration loaded (backend={:?}, conflict policy={})",
        config.backend,
        config.upload.on_conflict.as_str()
    );

    let backends = Backends::from_config(&config).await?;

    let recovered = backends
        .queue
        .recover()
        .await
        .context("Failed to recover in-flight queue messages")?;
    if recovered > 0 {
        info!("Returned {} in-flight messages to the queue", recovered);
    }

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let relay_handle = if config.relay.enabled {
        let worker = RelayWorker::new(
            backends.queue.clone(),
            backends.notifier.clone(),
            config.relay.clone(),
            config.server.public_base_url.clone(),
        );
        Some(tokio::spawn(worker.run(shutdown_rx)))
    } else {
        info!("Relay worker disabled");
        None
    };

    let addr = config.server.bind_address();
    let state = AppState::new(config, backends)?;
    let app = handlers::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Image Service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("HTTP server stopped, shutting down relay worker");
    let _ = shutdown_tx.send(()).await;
    if let Some(handle) = relay_handle {
        if let Err(e) = handle.await {
            error!("Relay worker panicked: {}", e);
        }
    }

    info!("Image Service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
