//! QueueEase daemon - Main Entry Point

mod logging;
mod settings;
mod telemetry;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use queueease_api_rpc::{RpcHandler, RpcServer, RpcServerConfig};
use queueease_core::application::{
    shutdown_channel, AnalyticsService, QueueConfig, QueueService, QueueWatcher, ShopDiscovery,
    ShopService,
};
use queueease_core::port::id_provider::UuidProvider;
use queueease_core::port::time_provider::SystemTimeProvider;
use queueease_core::port::{BroadcastChangeNotifier, ChangeNotifier, DisabledGeocoder, Geocoder};
use queueease_infra_geo::{SerpApiConfig, SerpApiGeocoder};
use queueease_infra_sqlite::{
    create_pool, run_migrations, SqliteQueueRepository, SqliteShopRepository,
};
use settings::DaemonSettings;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Settings and logging
    let settings = DaemonSettings::load()?;
    let _log_guard = logging::init(&settings)?;
    info!("QueueEase v{} starting...", VERSION);
    telemetry::report_status();

    // 2. Database
    let db_path = settings.db_path();
    if let Some(dir) = db_path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Cannot create database directory {}", dir.display()))?;
    }
    info!(db_path = %db_path.display(), "Initializing database...");

    let pool = create_pool(&db_path.to_string_lossy())
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 3. Adapters (DI wiring)
    let notifier: Arc<dyn ChangeNotifier> = Arc::new(BroadcastChangeNotifier::default());
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    let queue_repo = Arc::new(SqliteQueueRepository::new(pool.clone(), notifier.clone()));
    let shop_repo = Arc::new(SqliteShopRepository::new(pool.clone(), notifier.clone()));

    let geocoder: Arc<dyn Geocoder> = match settings.serpapi_key() {
        Some(key) => Arc::new(SerpApiGeocoder::new(SerpApiConfig::new(Some(key.to_string())))),
        None => {
            warn!("QUEUEEASE_SERPAPI_KEY not set; shops are located by device coordinates only");
            Arc::new(DisabledGeocoder)
        }
    };

    // 4. Services
    let queue_config = QueueConfig {
        guard_call_next: settings.guard_call_next,
    };
    let queue = Arc::new(QueueService::new(
        queue_repo.clone(),
        queue_repo.clone(),
        shop_repo.clone(),
        id_provider.clone(),
        time_provider.clone(),
        queue_config,
    ));
    let shops = Arc::new(ShopService::new(
        shop_repo.clone(),
        geocoder,
        id_provider,
        time_provider.clone(),
    ));
    let discovery = Arc::new(ShopDiscovery::new(shop_repo.clone(), queue_repo.clone()));
    let analytics = Arc::new(AnalyticsService::new(queue_repo, shop_repo));
    let watcher = Arc::new(QueueWatcher::new(queue.clone(), notifier));

    // 5. JSON-RPC server
    info!(guard_call_next = queue_config.guard_call_next, "Starting JSON-RPC server...");
    let (shutdown_tx, shutdown_token) = shutdown_channel();
    let handler = RpcHandler::new(queue, shops, discovery, analytics, time_provider);
    let rpc_config = RpcServerConfig {
        host: settings.rpc_host.clone(),
        port: settings.rpc_port,
    };
    let (addr, rpc_handle) = RpcServer::new(rpc_config, handler, watcher, shutdown_token)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(addr = %addr, "System ready");
    info!("Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Stop watchers, then the server, then the store
    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    if tokio::time::timeout(SHUTDOWN_GRACE, rpc_handle.stopped())
        .await
        .is_err()
    {
        warn!("RPC server did not stop within grace period");
    }
    pool.close().await;
    tokio::task::spawn_blocking(telemetry::shutdown)
        .await
        .context("Telemetry shutdown failed")?;

    info!("Shutdown complete.");
    Ok(())
}
