//! The libp2p swarm driving the overlay: a `request-response` behaviour for
//! the inference protocol and a Kademlia behaviour for discovery under the
//! `quiver.providers` topic (spec §9 settles the open question of which
//! topic string is canonical).
//!
//! The swarm runs in its own background task; callers talk to it through
//! `OverlayHandle`, which implements `quiver_core::overlay::{Overlay,
//! InboundOverlay}` over a command channel. This mirrors how the pack's
//! libp2p-based node crates (craft-ec-craftnet, calimero-network-core,
//! rillcoin-rill) isolate swarm ownership inside one task behind a handle
//! type, since `Swarm` itself is not `Sync`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use libp2p::{
    futures::StreamExt,
    identity, kad, request_response,
    swarm::{NetworkBehaviour, SwarmEvent},
    Multiaddr, PeerId as Libp2pPeerId, StreamProtocol, Swarm,
};
use tokio::sync::{mpsc, oneshot};

use quiver_core::error::{Error, Result};
use quiver_core::overlay::{
    InboundHandler, InboundOverlay, Overlay, PeerId, StreamRequest, StreamResponse,
    PROVIDER_DISCOVERY_TOPIC,
};

use crate::codec::{InferenceCodec, WireResponse};

#[derive(NetworkBehaviour)]
pub struct QuiverBehaviour {
    request_response: request_response::Behaviour<InferenceCodec>,
    kad: kad::Behaviour<kad::store::MemoryStore>,
}

enum Command {
    Discover {
        reply: oneshot::Sender<Result<Vec<PeerId>>>,
    },
    Call {
        peer: PeerId,
        request: StreamRequest,
        reply: oneshot::Sender<Result<StreamResponse>>,
    },
    SetHandler {
        handler: Arc<dyn InboundHandler>,
    },
}

/// A cloneable handle to a running swarm task. Implements both the
/// outbound (`Overlay`) and inbound (`InboundOverlay`) capability traits;
/// a gateway process only ever uses the former, a provider process uses
/// both.
#[derive(Clone)]
pub struct OverlayHandle {
    local_peer_id: PeerId,
    commands: mpsc::Sender<Command>,
}

impl OverlayHandle {
    /// Start a swarm listening on `listen_addr`, dialing `bootstrap_peers`
    /// for Kademlia discovery, and return a handle to it.
    pub async fn spawn(listen_addr: Multiaddr, bootstrap_peers: Vec<Multiaddr>) -> Result<Self> {
        let keypair = identity::Keypair::generate_ed25519();
        let local_peer_id = Libp2pPeerId::from(keypair.public());

        let mut swarm = libp2p::SwarmBuilder::with_existing_identity(keypair)
            .with_tokio()
            .with_tcp(
                Default::default(),
                libp2p::noise::Config::new,
                libp2p::yamux::Config::default,
            )
            .map_err(|e| Error::Internal(format!("failed to configure transport: {e}")))?
            .with_behaviour(|key| {
                let protocol = StreamProtocol::new(quiver_core::overlay::INFERENCE_PROTOCOL_ID);
                let request_response = request_response::Behaviour::with_codec(
                    InferenceCodec,
                    [(protocol, request_response::ProtocolSupport::Full)],
                    request_response::Config::default(),
                );
                let store = kad::store::MemoryStore::new(key.public().to_peer_id());
                let kad = kad::Behaviour::new(key.public().to_peer_id(), store);
                QuiverBehaviour { request_response, kad }
            })
            .map_err(|e| Error::Internal(format!("failed to build behaviour: {e}")))?
            .with_swarm_config(|c| c.with_idle_connection_timeout(Duration::from_secs(60)))
            .build();

        swarm
            .listen_on(listen_addr)
            .map_err(|e| Error::Internal(format!("failed to listen: {e}")))?;

        for addr in bootstrap_peers {
            if let Err(e) = swarm.dial(addr.clone()) {
                tracing::warn!(%addr, error = %e, "failed to dial bootstrap peer");
            }
        }

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(run_swarm(swarm, rx));

        Ok(OverlayHandle {
            local_peer_id: PeerId(local_peer_id.to_string()),
            commands: tx,
        })
    }
}

#[async_trait]
impl Overlay for OverlayHandle {
    fn local_peer_id(&self) -> PeerId {
        self.local_peer_id.clone()
    }

    async fn discover(&self, _protocol_id: &str) -> Result<Vec<PeerId>> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Discover { reply })
            .await
            .map_err(|_| Error::Internal("overlay task not running".to_string()))?;
        rx.await
            .map_err(|_| Error::Internal("overlay task dropped discover reply".to_string()))?
    }

    async fn call(
        &self,
        peer_id: &PeerId,
        _protocol_id: &str,
        request: &StreamRequest,
    ) -> Result<StreamResponse> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Call {
                peer: peer_id.clone(),
                request: request.clone(),
                reply,
            })
            .await
            .map_err(|_| Error::Internal("overlay task not running".to_string()))?;
        rx.await
            .map_err(|_| Error::Internal("overlay task dropped call reply".to_string()))?
    }
}

#[async_trait]
impl InboundOverlay for OverlayHandle {
    fn local_peer_id(&self) -> PeerId {
        self.local_peer_id.clone()
    }

    async fn serve(&self, _protocol_id: &str, handler: Arc<dyn InboundHandler>) -> Result<()> {
        self.commands
            .send(Command::SetHandler { handler })
            .await
            .map_err(|_| Error::Internal("overlay task not running".to_string()))
    }
}

async fn run_swarm(mut swarm: Swarm<QuiverBehaviour>, mut commands: mpsc::Receiver<Command>) {
    let mut handler: Option<Arc<dyn InboundHandler>> = None;
    let mut pending_calls: HashMap<
        request_response::OutboundRequestId,
        oneshot::Sender<Result<StreamResponse>>,
    > = HashMap::new();
    let mut known_peers: Vec<PeerId> = Vec::new();

    loop {
        tokio::select! {
            Some(command) = commands.recv() => match command {
                Command::Discover { reply } => {
                    let _ = swarm
                        .behaviour_mut()
                        .kad
                        .get_providers(PROVIDER_DISCOVERY_TOPIC.as_bytes().to_vec().into());
                    let _ = reply.send(Ok(known_peers.clone()));
                }
                Command::Call { peer, request, reply } => {
                    match peer.0.parse::<Libp2pPeerId>() {
                        Ok(libp2p_peer) => {
                            let request_id = swarm
                                .behaviour_mut()
                                .request_response
                                .send_request(&libp2p_peer, request);
                            pending_calls.insert(request_id, reply);
                        }
                        Err(_) => {
                            let _ = reply.send(Err(Error::Internal(format!(
                                "malformed peer id: {peer}"
                            ))));
                        }
                    }
                }
                Command::SetHandler { handler: h } => {
                    handler = Some(h);
                }
            },
            event = swarm.select_next_some() => {
                handle_swarm_event(event, &mut swarm, &handler, &mut pending_calls, &mut known_peers).await;
            }
        }
    }
}

async fn handle_swarm_event(
    event: SwarmEvent<QuiverBehaviourEvent>,
    swarm: &mut Swarm<QuiverBehaviour>,
    handler: &Option<Arc<dyn InboundHandler>>,
    pending_calls: &mut HashMap<
        request_response::OutboundRequestId,
        oneshot::Sender<Result<StreamResponse>>,
    >,
    known_peers: &mut Vec<PeerId>,
) {
    match event {
        SwarmEvent::ConnectionEstablished { peer_id, .. } => {
            let id = PeerId(peer_id.to_string());
            if !known_peers.contains(&id) {
                known_peers.push(id);
            }
        }
        SwarmEvent::Behaviour(QuiverBehaviourEvent::RequestResponse(
            request_response::Event::Message { message, .. },
        )) => match message {
            request_response::Message::Request {
                request, channel, ..
            } => {
                let wire = if let Some(h) = handler {
                    match h.handle(request).await {
                        Ok(resp) => WireResponse::Ok(resp),
                        Err(err) => WireResponse::Err(
                            quiver_core::overlay::StreamErrorResponse { error: err },
                        ),
                    }
                } else {
                    WireResponse::Err(quiver_core::overlay::StreamErrorResponse {
                        error: "no inbound handler registered".to_string(),
                    })
                };
                let _ = swarm
                    .behaviour_mut()
                    .request_response
                    .send_response(channel, wire);
            }
            request_response::Message::Response {
                request_id,
                response,
            } => {
                if let Some(reply) = pending_calls.remove(&request_id) {
                    let result = match response {
                        WireResponse::Ok(resp) => Ok(resp),
                        WireResponse::Err(e) => Err(Error::Internal(e.error)),
                    };
                    let _ = reply.send(result);
                }
            }
        },
        SwarmEvent::Behaviour(QuiverBehaviourEvent::RequestResponse(
            request_response::Event::OutboundFailure {
                request_id, error, ..
            },
        )) => {
            if let Some(reply) = pending_calls.remove(&request_id) {
                let _ = reply.send(Err(Error::Unavailable(format!(
                    "outbound stream failed: {error}"
                ))));
            }
        }
        _ => {}
    }
}
