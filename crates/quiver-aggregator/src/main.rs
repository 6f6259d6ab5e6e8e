// Quiver aggregator: batches signed receipts into per-epoch Merkle
// commitments and verifies inclusion claims against the finalized root.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use quiver_aggregator::epoch::EpochManager;
use quiver_aggregator::payout::FlatRatePolicy;
use quiver_aggregator::store::Store;
use quiver_aggregator::{config, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("quiver-aggregator starting");

    let config = config::Config::from_env()?;
    info!("configuration loaded");

    let app_state = AppState {
        store: Arc::new(Store::new()),
        epochs: Arc::new(EpochManager::new()),
        payout_policy: Arc::new(FlatRatePolicy),
        max_receipt_bytes: config.max_receipt_bytes,
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(app_state)).await?;

    Ok(())
}
