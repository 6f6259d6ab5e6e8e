//! Production implementation of the Quiver overlay traits over libp2p:
//! a `request-response` protocol for the inference call itself, and
//! Kademlia for provider discovery.

mod codec;
mod swarm;

pub use swarm::OverlayHandle;
