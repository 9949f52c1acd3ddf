// src/main.rs
use anyhow::{Context, Result};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use health_pinger::{
    config,
    health::{HttpProber, Scheduler, SweepCoordinator},
    metrics::MetricsRegistry,
    registry::EndpointRegistry,
    server::{RequestHandler, ServerBuilder},
    status::StatusTable,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("health_pinger=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;

    let registry = EndpointRegistry::from_config(&config)?;
    info!(
        endpoints = registry.len(),
        interval_minutes = config.ping_interval_minutes,
        "Loaded endpoint registry"
    );

    let metrics_registry = if config.metrics.enabled {
        Some(Arc::new(MetricsRegistry::new()?))
    } else {
        None
    };

    let prober = HttpProber::new(config.probe_timeout()).context("Failed to create HTTP client")?;
    let coordinator = Arc::new(SweepCoordinator::new(
        registry,
        StatusTable::new(),
        Arc::new(prober),
        metrics_registry.as_ref().map(|r| r.collector()),
    ));
    let scheduler = Arc::new(Scheduler::new(coordinator, config.ping_interval()));

    // First sweep completes before the server starts answering
    scheduler.start().await;

    let mut handler = RequestHandler::new(scheduler.clone());
    if let Some(registry) = metrics_registry {
        handler = handler.with_metrics(registry, &config.metrics.path);
    }

    let host: IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid listen host {}", config.server.host))?;
    let addr = SocketAddr::new(host, config.server.port);
    info!("Starting health pinger on {}", addr);

    let served = ServerBuilder::new(addr)
        .with_handler(handler)
        .serve_with_shutdown(shutdown_signal())
        .await;

    scheduler.stop().await;
    served
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
