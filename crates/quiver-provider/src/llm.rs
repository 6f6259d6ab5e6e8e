//! HTTP client for the local model runtime (spec §6.2), grounded on the
//! original Go source's `OllamaHandler` (POST `…/api/generate`, non-streaming,
//! decode `{response, prompt_eval_count, eval_count}`), reimplemented
//! against the `ModelRuntime` trait so the provider's receipt-building
//! logic never depends on `reqwest` directly.

use async_trait::async_trait;
use quiver_core::error::{Error, Result};
use quiver_core::model::{ModelRequest, ModelResponse, ModelRuntime};
use std::time::Duration;

pub struct OllamaRuntime {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaRuntime {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client configuration is static and valid");
        OllamaRuntime {
            base_url: base_url.into(),
            client,
        }
    }
}

#[async_trait]
impl ModelRuntime for OllamaRuntime {
    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("model runtime request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Internal(format!(
                "model runtime returned {status}: {body}"
            )));
        }

        response
            .json::<ModelResponse>()
            .await
            .map_err(|e| Error::Internal(format!("failed to decode model runtime response: {e}")))
    }
}
