// Quiver gateway: routes client prompts to providers over the overlay,
// injects canary checks, and load-balances across discovered candidates.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use quiver_gateway::balancer::LoadBalancer;
use quiver_gateway::ratelimit::PerTokenLimiter;
use quiver_gateway::{config, router, AppState};

mod reaper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("quiver-gateway starting");

    let config = config::Config::from_env()?;
    info!("configuration loaded");

    let listen_addr = config.p2p_listen_addr.parse()?;
    let bootstrap_peers: anyhow::Result<Vec<_>> = config
        .bootstrap_peers
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(anyhow::Error::from))
        .collect();
    let overlay = quiver_overlay::OverlayHandle::spawn(listen_addr, bootstrap_peers?).await?;
    info!(peer_id = %overlay.local_peer_id(), "overlay listening");

    let limiter = Arc::new(PerTokenLimiter::new(config.rate_limit_per_token));
    let balancer = Arc::new(LoadBalancer::new());

    reaper::spawn(limiter.clone(), balancer.clone());

    let app_state = AppState {
        overlay: Arc::new(overlay),
        limiter,
        balancer,
        canary_rate: config.canary_rate,
        max_prompt_bytes: config.max_prompt_bytes,
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(app_state)).await?;

    Ok(())
}
