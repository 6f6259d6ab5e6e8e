//! The provider stream handler (spec §4.3): per-stream state machine
//! `await_request -> decoded -> limited -> generating -> built_receipt ->
//! signed -> responded -> closed`, with fatal transitions jumping straight
//! to `responded{error}`. Grounded on the teacher's handler shape
//! (validate -> act -> build receipt -> sign -> persist -> respond) as
//! seen in `api::handlers::create_pointer`, generalized from one HTTP
//! request to one overlay stream and from a database receipt to a
//! Merkle/Ed25519 one.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use quiver_core::hashing::sha256_hex;
use quiver_core::model::{ModelRequest, ModelRuntime};
use quiver_core::overlay::{InboundHandler, InferenceResult, StreamRequest, StreamResponse};
use quiver_core::receipt::{Canary, Ed25519Keypair, RateInfo, Receipt, ReceiptFields};

use crate::chain::ChainState;
use crate::ratelimit::ProviderLimiter;

pub struct InferenceHandler {
    keypair: Ed25519Keypair,
    model_runtime: Arc<dyn ModelRuntime>,
    limiter: ProviderLimiter,
    chain: ChainState,
    max_prompt_bytes: usize,
    rate_limit_deadline: Duration,
}

impl InferenceHandler {
    pub fn new(
        keypair: Ed25519Keypair,
        model_runtime: Arc<dyn ModelRuntime>,
        tokens_per_second: u32,
        max_prompt_bytes: usize,
        rate_limit_deadline: Duration,
    ) -> Self {
        InferenceHandler {
            keypair,
            model_runtime,
            limiter: ProviderLimiter::new(tokens_per_second),
            chain: ChainState::new(),
            max_prompt_bytes,
            rate_limit_deadline,
        }
    }

    async fn process(&self, request: StreamRequest) -> Result<StreamResponse, String> {
        // decoded
        if request.prompt.len() > self.max_prompt_bytes {
            return Err("prompt_too_large".to_string());
        }

        // limited
        if !self.limiter.acquire(self.rate_limit_deadline).await {
            return Err("rate_limited".to_string());
        }

        // generating
        let start = Utc::now();
        let model_request = ModelRequest::new(request.model.clone(), request.prompt.clone());
        let model_response = self
            .model_runtime
            .generate(model_request)
            .await
            .map_err(|e| format!("llm_error: {e}"))?;
        let end = Utc::now();

        // built_receipt (seq/prev_hash reservation + build happen under
        // the chain mutex, spec §4.3 step 4)
        let provider_pk = self.keypair.public_key_base64();
        let prompt_hash = sha256_hex(request.prompt.as_bytes());
        let output_hash = sha256_hex(model_response.response.as_bytes());

        let receipt = self
            .chain
            .next(move |seq, prev_hash| {
                Receipt::new(ReceiptFields {
                    provider_pk: provider_pk.clone(),
                    model: request.model.clone(),
                    prompt_hash: prompt_hash.clone(),
                    output_hash: output_hash.clone(),
                    tokens_in: model_response.prompt_eval_count,
                    tokens_out: model_response.eval_count,
                    start,
                    end,
                    seq,
                    prev_hash,
                    canary: Canary::default(),
                    rate: RateInfo::default(),
                })
            })
            .map_err(|e| format!("internal: {e}"))?;

        // signed
        let signed_receipt = self
            .keypair
            .sign_receipt(&receipt)
            .map_err(|e| format!("internal: {e}"))?;

        Ok(StreamResponse {
            completion: model_response.response,
            signed_receipt,
        })
    }
}

#[async_trait::async_trait]
impl InboundHandler for InferenceHandler {
    async fn handle(&self, request: StreamRequest) -> InferenceResult {
        info!(model = %request.model, prompt_len = request.prompt.len(), "inference request received");

        match self.process(request).await {
            Ok(response) => {
                info!(receipt_id = %response.signed_receipt.receipt.receipt_id, "responded");
                Ok(response)
            }
            Err(error) => {
                if error == "rate_limited" || error.starts_with("llm_error") {
                    warn!(%error, "request failed");
                } else {
                    error!(%error, "request failed");
                }
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_core::test_support::MockModelRuntime;

    fn handler() -> InferenceHandler {
        InferenceHandler::new(
            Ed25519Keypair::generate(),
            Arc::new(MockModelRuntime::new()),
            100,
            4096,
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn produces_signed_receipt_with_chain_link() {
        let handler = handler();
        let req = StreamRequest {
            prompt: "hello".to_string(),
            model: "m".to_string(),
            max_tokens: 32,
            stream: false,
        };

        let r1 = handler.handle(req.clone()).await.unwrap();
        assert_eq!(r1.signed_receipt.receipt.prev_hash, "");
        assert_eq!(r1.signed_receipt.receipt.seq, 1);

        let r2 = handler.handle(req).await.unwrap();
        assert_eq!(r2.signed_receipt.receipt.seq, 2);
        assert_eq!(
            r2.signed_receipt.receipt.prev_hash,
            r1.signed_receipt.receipt.chained_hash().unwrap()
        );
    }

    #[tokio::test]
    async fn oversize_prompt_rejected() {
        let handler = InferenceHandler::new(
            Ed25519Keypair::generate(),
            Arc::new(MockModelRuntime::new()),
            100,
            4,
            Duration::from_millis(50),
        );
        let req = StreamRequest {
            prompt: "way too long".to_string(),
            model: "m".to_string(),
            max_tokens: 32,
            stream: false,
        };
        let err = handler.handle(req).await.unwrap_err();
        assert_eq!(err, "prompt_too_large");
    }

    #[tokio::test]
    async fn rate_limit_exhaustion_surfaces() {
        let handler = InferenceHandler::new(
            Ed25519Keypair::generate(),
            Arc::new(MockModelRuntime::new()),
            1,
            4096,
            Duration::from_millis(0),
        );
        let req = StreamRequest {
            prompt: "hi".to_string(),
            model: "m".to_string(),
            max_tokens: 32,
            stream: false,
        };
        assert!(handler.handle(req.clone()).await.is_ok());
        assert!(handler.handle(req.clone()).await.is_ok());
        let err = handler.handle(req).await.unwrap_err();
        assert_eq!(err, "rate_limited");
    }
}
