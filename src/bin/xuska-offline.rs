use std::{net::SocketAddr, sync::Arc};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use xuska::offline::notify::LogNotifier;
use xuska::offline::proxy::{router, spawn_sync_task, ProxyState};
use xuska::offline::{CacheController, CacheManifest, DiskCacheStore, HttpNetwork};
use xuska::OfflineConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = OfflineConfig::from_env()?;
    let controller = Arc::new(CacheController::new(
        config.upstream.clone(),
        CacheManifest::app_shell(&config.generation),
        HttpNetwork::new()?,
        DiskCacheStore::new(&config.cache_dir),
    )?);

    let phase = controller.start().await;
    info!(?phase, upstream = %config.upstream, "cache controller ready");
    spawn_sync_task(Arc::clone(&controller), config.sync_interval);

    let state = ProxyState {
        controller,
        notifier: Arc::new(LogNotifier),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("offline proxy listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
