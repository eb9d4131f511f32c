//! Monitor service entry point.
//!
//! Real-time order monitoring: synthesizes orders on a fixed interval,
//! publishes them to Redis, and streams statistics snapshots to WebSocket
//! viewers.

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use monitor_service::{
    create_router, AppState, Hub, OrderGenerator, PrometheusMetrics, RedisPublisher,
    DEFAULT_INTERVAL_SECS, DEFAULT_ORDERS_CHANNEL,
};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting monitor service");

    // Read configuration from environment
    let http_port: u16 = env::var("HTTP_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .expect("HTTP_PORT must be a number");
    let metrics_port: u16 = env::var("METRICS_PORT")
        .unwrap_or_else(|_| "9091".to_string())
        .parse()
        .expect("METRICS_PORT must be a number");
    let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let orders_channel =
        env::var("ORDERS_CHANNEL").unwrap_or_else(|_| DEFAULT_ORDERS_CHANNEL.to_string());
    let interval_secs: u64 = env::var("GENERATION_INTERVAL_SECS")
        .unwrap_or_else(|_| DEFAULT_INTERVAL_SECS.to_string())
        .parse()
        .expect("GENERATION_INTERVAL_SECS must be a number");

    info!("Configuration:");
    info!("  HTTP_PORT: {}", http_port);
    info!("  METRICS_PORT: {}", metrics_port);
    info!("  REDIS_URL: {}", redis_url);
    info!("  ORDERS_CHANNEL: {}", orders_channel);
    info!("  GENERATION_INTERVAL_SECS: {}", interval_secs);

    // Start Prometheus metrics server
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], metrics_port))
        .install()
        .expect("Failed to start Prometheus exporter");
    info!("Prometheus metrics server started on port {}", metrics_port);

    let metrics = Arc::new(PrometheusMetrics);

    // Publish sink for raw order events
    let publisher = Arc::new(RedisPublisher::new(&redis_url, &orders_channel)?);
    info!("Publishing order events to channel '{}'", orders_channel);

    // Spawn the hub coordinator
    let (hub, hub_handle) = Hub::new(metrics.clone());
    let hub_task = tokio::spawn(hub.run());

    // Spawn the order generator
    let generator = OrderGenerator::new(
        hub_handle.clone(),
        publisher,
        metrics,
        Duration::from_secs(interval_secs),
    );
    let (generator_shutdown_tx, generator_shutdown_rx) = mpsc::channel(1);
    let generator_task = tokio::spawn(generator.run(generator_shutdown_rx));

    // Create HTTP router
    let app = create_router(AppState {
        hub: hub_handle.clone(),
    });

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let listener = TcpListener::bind(addr).await?;
    info!("Monitor service listening on {}", addr);
    info!("  Dashboard: http://localhost:{}/", http_port);
    info!("  WebSocket: ws://localhost:{}/ws", http_port);
    info!("  Metrics:   http://localhost:{}/metrics", metrics_port);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the generator, then close all viewers
    info!("Shutting down...");
    let _ = generator_shutdown_tx.send(()).await;
    let _ = generator_task.await;
    hub_handle.shutdown();
    let _ = hub_task.await;

    info!("Monitor service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received terminate signal"),
    }
}
