//! HTTP API for terrain-aware RF propagation predictions.

mod config;
mod error;
mod handlers;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use signalpath::cache::{LocalTileStore, RemoteStoreConfig, RemoteTileStore, TileStore};
use signalpath::engine::EngineBinaries;
use signalpath::jobs::JobStore;
use signalpath::params::ParamBuilder;
use signalpath::predict::{AntennaPatternLibrary, PredictionService};

use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::routes::build_router;

/// Interval between job store sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let config = AppConfig::from_env()?;

    // Missing engine binaries are fatal at startup, not at first request.
    let binaries = EngineBinaries::discover()?;

    let tiles: Arc<dyn TileStore> = match &config.tile_source_url {
        Some(base_url) => {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()?;
            Arc::new(
                RemoteTileStore::new(
                    client,
                    RemoteStoreConfig {
                        base_url: base_url.clone(),
                        tile_dir: config.tile_dir.clone(),
                        max_bytes: config.cache_max_bytes,
                    },
                    binaries.clone(),
                )
                .await?,
            )
        }
        None => {
            info!(dir = %config.tile_dir.display(), "no tile source configured, serving local tiles only");
            Arc::new(LocalTileStore::new(config.tile_dir.clone()))
        }
    };

    let mut service = PredictionService::new(binaries, tiles, ParamBuilder::new(config.dipole_offset));
    if let Some(dir) = &config.antenna_pattern_dir {
        service = service.with_patterns(AntennaPatternLibrary::new(dir.clone()));
    }
    let service = Arc::new(service);
    let jobs = Arc::new(JobStore::new(config.job_ttl));

    let state = AppState {
        service,
        jobs,
        artifacts: Arc::new(DashMap::new()),
    };

    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            sweep_state.sweep();
        }
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
