//! StreamWeaver Broker
//!
//! Process entry point. Loads and validates the TOML configuration, wires
//! the hot-store services, cold-storage manager, and retention loop under
//! one root cancellation token, and serves the gRPC surface until a
//! shutdown signal arrives.
//!
//! Startup failures (config, backend construction, listen) exit nonzero;
//! once serving, runtime errors are logged and never terminate the
//! process.

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use streamweaver_hotstore::{
    MemoryStreamBackend, RetentionDefaults, StreamBackend, StreamMetadataService, StreamService,
};
use streamweaver_proto::broker::stream_weaver_broker_server::StreamWeaverBrokerServer;
use streamweaver_retention::{
    Archiver, PolicyEntry, RetentionManager, RetentionManagerConfig, TimeRetentionPolicy,
};
use streamweaver_server::config::LoggingConfig;
use streamweaver_server::{BrokerConfig, StreamWeaverBrokerService};
use streamweaver_storage::{create_storage_backend, StorageManager, StorageManagerConfig};
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::info;

#[derive(Parser)]
#[command(name = "streamweaver-broker", about = "StreamWeaver message broker")]
struct Args {
    /// Path to the broker configuration file.
    #[arg(long, default_value = "streamweaver.toml")]
    config: PathBuf,
}

fn init_tracing(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = BrokerConfig::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    init_tracing(&config.logging);

    // Root cancellation token: the one shutdown signal every subsystem
    // threads through its async boundaries.
    let root = CancellationToken::new();

    // Hot-store services.
    let backend: Arc<dyn StreamBackend> = Arc::new(MemoryStreamBackend::new());
    let metadata = Arc::new(StreamMetadataService::new(backend.clone()));
    let defaults = RetentionDefaults {
        max_age_ms: config.retention.max_age_ms()?,
        cleanup_policy: config.retention.parsed_cleanup_policy()?,
    };
    let streams = Arc::new(StreamService::new(
        backend.clone(),
        metadata.clone(),
        defaults,
    ));

    // Cold storage.
    let provider_config = config.storage.provider_config()?;
    let storage_backend = create_storage_backend(&provider_config)
        .await
        .context("initializing storage backend")?;
    info!(provider = %storage_backend.provider(), "Initialized storage backend");

    let storage = Arc::new(StorageManager::new(StorageManagerConfig::default()));
    storage.register_backend(storage_backend)?;
    storage.start(&root)?;

    // Retention.
    let archiver = Arc::new(Archiver::new(storage.clone()));
    let time_policy = TimeRetentionPolicy::new(
        backend.clone(),
        metadata.clone(),
        archiver,
        config.retention.batch_size,
        root.clone(),
    );
    let retention = Arc::new(RetentionManager::new(RetentionManagerConfig {
        interval: Duration::from_secs(config.retention.interval_seconds),
    }));
    retention.register_policy(PolicyEntry::new("time", Arc::new(time_policy)))?;
    let retention_handle = retention.start(root.clone())?;

    // Shutdown signal handler.
    let shutdown_token = root.clone();
    tokio::spawn(async move {
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
                info!("Received SIGINT, initiating graceful shutdown");
            }
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown");
            }
        }
        shutdown_token.cancel();
    });

    // gRPC surface.
    let addr: SocketAddr = format!("0.0.0.0:{}", config.port)
        .parse()
        .context("parsing listen address")?;
    let service = StreamWeaverBrokerService::new(streams);

    info!(port = config.port, "StreamWeaver broker starting");
    let serve_token = root.clone();
    Server::builder()
        .add_service(StreamWeaverBrokerServer::new(service))
        .serve_with_shutdown(addr, async move {
            serve_token.cancelled().await;
        })
        .await
        .context("serving gRPC")?;

    // The RPC surface is down; drain the background subsystems.
    retention_handle.await?;
    storage.stop(Duration::from_secs(30)).await?;

    info!("StreamWeaver broker shut down gracefully");
    Ok(())
}
