//! Aggregator configuration (spec §6.5), same env-var-plus-defaults shape
//! as the backend teacher's `Config::from_env`.

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_receipt_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8081".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let max_receipt_bytes = std::env::var("MAX_RECEIPT_BYTES")
            .unwrap_or_else(|_| "10240".to_string())
            .parse()
            .context("MAX_RECEIPT_BYTES must be a valid usize")?;

        Ok(Config {
            host,
            port,
            max_receipt_bytes,
        })
    }
}
