//! The peer-to-peer overlay capability contract (spec §6.1). The overlay
//! itself (peer identity, DHT discovery, stream transport) is an external
//! collaborator out of scope for this spec; this module only fixes the
//! shape the gateway and provider binaries program against, so they can be
//! built and unit-tested without a live libp2p swarm. `quiver-overlay`
//! supplies the production implementation over libp2p.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

pub const INFERENCE_PROTOCOL_ID: &str = "/quiver/inference/1.0.0";

/// DHT rendezvous topic providers advertise under and gateways search for.
/// Spec §9 leaves this ambiguous between two Go client variants; this
/// implementation settles on the `quiver.providers` form.
pub const PROVIDER_DISCOVERY_TOPIC: &str = "quiver.providers";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub String);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRequest {
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamResponse {
    pub completion: String,
    pub signed_receipt: crate::receipt::SignedReceipt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamErrorResponse {
    pub error: String,
}

/// A directed, single-round-trip stream to a known peer over a named
/// protocol, plus the discovery call gateways use to find candidate
/// providers. Modeled after spec §6.1's `open_stream`/`discover` pair.
#[async_trait]
pub trait Overlay: Send + Sync {
    /// This process's own stable peer id.
    fn local_peer_id(&self) -> PeerId;

    /// Discover peers advertising `protocol_id`.
    async fn discover(&self, protocol_id: &str) -> Result<Vec<PeerId>>;

    /// Open a stream to `peer_id` for `protocol_id`, write `request`, and
    /// read back exactly one response. A single round trip is all the
    /// inference protocol needs (spec §4.3: read request, reply once,
    /// close).
    async fn call(
        &self,
        peer_id: &PeerId,
        protocol_id: &str,
        request: &StreamRequest,
    ) -> Result<StreamResponse>;
}

/// A result type for inbound stream handlers: `Ok` carries the completion
/// and signed receipt to write back; `Err` carries the error string to
/// report on the stream (spec §4.3's `{error}` reply, never a 5xx).
pub type InferenceResult = std::result::Result<StreamResponse, String>;

/// One inbound inference request, handled and answered on the same stream.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle(&self, request: StreamRequest) -> InferenceResult;
}

/// The provider side of the overlay: registering a handler for inbound
/// inference streams (spec §6.1 `set_stream_handler`).
#[async_trait]
pub trait InboundOverlay: Send + Sync {
    fn local_peer_id(&self) -> PeerId;

    /// Serve `protocol_id`, invoking `handler` once per inbound stream and
    /// writing back whatever it returns. Runs until cancelled.
    async fn serve(
        &self,
        protocol_id: &str,
        handler: std::sync::Arc<dyn InboundHandler>,
    ) -> Result<()>;
}
