//! The local model runtime capability contract (spec §6.2): an HTTP-style
//! text-generation service the provider calls for every completion. Out of
//! scope to implement ourselves; fixed here as a trait so the provider
//! binary's receipt-building logic can be tested against a mock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f64,
    pub seed: u64,
    pub stream: bool,
}

impl ModelRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        ModelRequest {
            model: model.into(),
            prompt: prompt.into(),
            temperature: 0.0,
            seed: 42,
            stream: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelResponse {
    pub response: String,
    #[serde(default)]
    pub prompt_eval_count: u64,
    #[serde(default)]
    pub eval_count: u64,
}

#[async_trait]
pub trait ModelRuntime: Send + Sync {
    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse>;
}
