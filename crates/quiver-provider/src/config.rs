//! Provider configuration (spec §6.5), read from the environment the same
//! way the backend teacher's `Config::from_env` does: `dotenvy` for a
//! local `.env`, `std::env::var` with sensible defaults, `anyhow::Context`
//! for anything that must parse.

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub p2p_listen_addr: String,
    pub bootstrap_peers: Vec<String>,
    pub model_runtime_url: String,
    pub request_timeout_secs: u64,
    pub tokens_per_second: u32,
    pub max_prompt_bytes: usize,
    pub private_key_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let p2p_listen_addr = std::env::var("P2P_LISTEN_ADDR")
            .unwrap_or_else(|_| "/ip4/0.0.0.0/tcp/0".to_string());

        let bootstrap_peers = std::env::var("BOOTSTRAP_PEERS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let model_runtime_url = std::env::var("MODEL_RUNTIME_URL")
            .unwrap_or_else(|_| "http://localhost:11434".to_string());

        let request_timeout_secs = std::env::var("REQUEST_TIMEOUT")
            .unwrap_or_else(|_| "120".to_string())
            .parse()
            .context("REQUEST_TIMEOUT must be a valid u64 (seconds)")?;

        let tokens_per_second = std::env::var("TOKENS_PER_SECOND")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("TOKENS_PER_SECOND must be a valid u32")?;

        let max_prompt_bytes = std::env::var("MAX_PROMPT_BYTES")
            .unwrap_or_else(|_| "4096".to_string())
            .parse()
            .context("MAX_PROMPT_BYTES must be a valid usize")?;

        let private_key_path = std::env::var("PRIVATE_KEY_PATH")
            .unwrap_or_else(|_| "provider_key.bin".to_string());

        Ok(Config {
            p2p_listen_addr,
            bootstrap_peers,
            model_runtime_url,
            request_timeout_secs,
            tokens_per_second,
            max_prompt_bytes,
            private_key_path,
        })
    }
}
