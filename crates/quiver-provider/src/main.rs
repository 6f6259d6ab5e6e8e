// Quiver provider: rate-limited, per-peer-serialized inference service
// producing signed, hash-chained receipts for every completion.

use std::sync::Arc;
use std::time::Duration;

use quiver_core::overlay::{InboundOverlay, INFERENCE_PROTOCOL_ID};
use tracing::info;

mod chain;
mod config;
mod handler;
mod keystore;
mod llm;
mod ratelimit;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("quiver-provider starting");

    let config = config::Config::from_env()?;
    info!("configuration loaded");

    let keypair = keystore::load_or_generate_keypair(&config.private_key_path)?;
    info!(public_key = %keypair.public_key_base64(), "provider identity ready");

    let model_runtime = Arc::new(llm::OllamaRuntime::new(
        config.model_runtime_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
    ));

    let inference_handler = Arc::new(handler::InferenceHandler::new(
        keypair,
        model_runtime,
        config.tokens_per_second,
        config.max_prompt_bytes,
        Duration::from_secs(1),
    ));

    let listen_addr = config.p2p_listen_addr.parse()?;
    let bootstrap_peers: anyhow::Result<Vec<_>> = config
        .bootstrap_peers
        .iter()
        .map(|s| s.parse().map_err(anyhow::Error::from))
        .collect();
    let overlay = quiver_overlay::OverlayHandle::spawn(listen_addr, bootstrap_peers?).await?;

    info!(peer_id = %overlay.local_peer_id(), "overlay listening");

    overlay
        .serve(INFERENCE_PROTOCOL_ID, inference_handler)
        .await?;

    info!("ready to serve inference streams on {}", INFERENCE_PROTOCOL_ID);

    // Park this task; the swarm and the handler run on their own tasks.
    std::future::pending::<()>().await;
    Ok(())
}
