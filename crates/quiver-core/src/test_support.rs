//! In-process fakes for the external collaborators in spec §6, analogous
//! to how the backend teacher drives its own handlers in tests purely
//! through `reqwest` against a spawned router rather than a live Postgres
//! instance. Gated behind the `test-support` feature so it never ships in
//! release binaries.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{ModelRequest, ModelResponse, ModelRuntime};
use crate::overlay::{Overlay, PeerId, StreamRequest, StreamResponse};

/// A model runtime that echoes a fixed table of prompt -> response pairs,
/// falling back to a deterministic templated reply.
pub struct MockModelRuntime {
    fixed: HashMap<String, String>,
}

impl MockModelRuntime {
    pub fn new() -> Self {
        MockModelRuntime {
            fixed: HashMap::new(),
        }
    }

    pub fn with_response(mut self, prompt: impl Into<String>, response: impl Into<String>) -> Self {
        self.fixed.insert(prompt.into(), response.into());
        self
    }
}

impl Default for MockModelRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelRuntime for MockModelRuntime {
    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse> {
        let response = self
            .fixed
            .get(&request.prompt)
            .cloned()
            .unwrap_or_else(|| format!("mock-response-to: {}", request.prompt));
        let prompt_eval_count = request.prompt.split_whitespace().count() as u64;
        let eval_count = response.split_whitespace().count() as u64;
        Ok(ModelResponse {
            response,
            prompt_eval_count,
            eval_count,
        })
    }
}

/// A fixed, in-memory set of providers reachable via direct in-process
/// calls to a registered handler, standing in for libp2p discovery +
/// `request-response` during gateway tests.
pub struct MockOverlay {
    local: PeerId,
    providers: Mutex<HashMap<PeerId, std::sync::Arc<dyn crate::overlay::InboundHandler>>>,
}

impl MockOverlay {
    pub fn new(local: PeerId) -> Self {
        MockOverlay {
            local,
            providers: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, peer: PeerId, handler: std::sync::Arc<dyn crate::overlay::InboundHandler>) {
        self.providers.lock().unwrap().insert(peer, handler);
    }

    pub fn remove(&self, peer: &PeerId) {
        self.providers.lock().unwrap().remove(peer);
    }
}

#[async_trait]
impl Overlay for MockOverlay {
    fn local_peer_id(&self) -> PeerId {
        self.local.clone()
    }

    async fn discover(&self, _protocol_id: &str) -> Result<Vec<PeerId>> {
        Ok(self.providers.lock().unwrap().keys().cloned().collect())
    }

    async fn call(
        &self,
        peer_id: &PeerId,
        _protocol_id: &str,
        request: &StreamRequest,
    ) -> Result<StreamResponse> {
        let handler = self
            .providers
            .lock()
            .unwrap()
            .get(peer_id)
            .cloned()
            .ok_or_else(|| Error::Unavailable(format!("unknown peer {peer_id}")))?;

        handler
            .handle(request.clone())
            .await
            .map_err(Error::Internal)
    }
}
