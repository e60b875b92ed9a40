//! thatch-services: registries, handshake, discovery and the node operations
//! behind both RPC planes.

pub mod chat;
pub mod discovery;
pub mod error;
pub mod handshake;
pub mod node;
pub mod peer_client;
pub mod registry;
pub mod replay;
pub mod verify;

pub use chat::ChatRegistry;
pub use discovery::{probe_local_ipv4, sweep, Subnet, SweepSummary, SweepTrigger, Sweeper};
pub use error::{Result, ServiceError};
pub use handshake::HandshakeOutcome;
pub use node::{default_display_name, Node, NodeOptions};
pub use peer_client::PeerClient;
pub use registry::{PeerEntry, Registry};
pub use replay::ReplayGuard;
pub use verify::{verifier_for, SignatureVerifier};

/// Leading characters of an identity token, for log lines.
pub(crate) fn short(token: &str) -> &str {
    token.get(..16).unwrap_or(token)
}
