//! Gateway configuration (spec §6.5/§4.5), same env-var-plus-defaults shape
//! as the provider's and aggregator's `Config::from_env`. Grounded on the
//! original Go `internal/config.DefaultConfig` for the default values
//! (port 8080, 10 req/s per token, 5% canary rate).

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub p2p_listen_addr: String,
    pub bootstrap_peers: Vec<String>,
    pub request_timeout_secs: u64,
    pub rate_limit_per_token: u32,
    pub canary_rate: f64,
    pub max_prompt_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("GATEWAY_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("GATEWAY_PORT must be a valid u16")?;

        let p2p_listen_addr = std::env::var("P2P_LISTEN_ADDR")
            .unwrap_or_else(|_| "/ip4/0.0.0.0/tcp/4002".to_string());

        let bootstrap_peers = std::env::var("BOOTSTRAP_PEERS")
            .map(|s| s.split(',').map(str::to_string).collect())
            .unwrap_or_default();

        let request_timeout_secs = std::env::var("REQUEST_TIMEOUT")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("REQUEST_TIMEOUT must be a valid u64")?;

        let rate_limit_per_token = std::env::var("RATE_LIMIT_PER_TOKEN")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("RATE_LIMIT_PER_TOKEN must be a valid u32")?;

        let canary_rate = std::env::var("CANARY_RATE")
            .unwrap_or_else(|_| "0.05".to_string())
            .parse()
            .context("CANARY_RATE must be a valid f64")?;

        let max_prompt_bytes = std::env::var("MAX_PROMPT_BYTES")
            .unwrap_or_else(|_| "4096".to_string())
            .parse()
            .context("MAX_PROMPT_BYTES must be a valid usize")?;

        Ok(Config {
            host,
            port,
            p2p_listen_addr,
            bootstrap_peers,
            request_timeout_secs,
            rate_limit_per_token,
            canary_rate,
            max_prompt_bytes,
        })
    }
}
