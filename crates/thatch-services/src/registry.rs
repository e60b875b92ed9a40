//! Who this node has completed a handshake with.
//!
//! Two concurrent maps keyed by identity token: one for reachable peers and
//! one for their display identities. Both handshake roles upsert into it;
//! entries are overwritten on re-handshake and never removed while the
//! process runs.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use thatch_core::User;

use crate::peer_client::PeerClient;

/// A reachable node bound to the identity it proved during handshake.
#[derive(Debug, Clone)]
pub struct PeerEntry {
    /// Where the node's peer plane accepts calls.
    pub address: SocketAddr,
    /// Identity token asserted during handshake.
    pub authentication: String,
    /// Reusable handle for further peer-plane calls.
    pub client: PeerClient,
}

/// Shared registry handle. Cloning shares the underlying maps.
#[derive(Clone, Default)]
pub struct Registry {
    peers: Arc<DashMap<String, PeerEntry>>,
    users: Arc<DashMap<String, User>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the peer keyed by its identity token.
    pub fn upsert_peer(&self, peer: PeerEntry) {
        self.peers.insert(peer.authentication.clone(), peer);
    }

    /// Insert or overwrite the user keyed by its id.
    pub fn upsert_user(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    /// Record both halves of a completed handshake.
    pub fn register(&self, peer: PeerEntry, name: String) {
        let user = User::new(name, peer.authentication.clone());
        tracing::info!(
            peer = crate::short(&peer.authentication),
            name = %user.name,
            addr = %peer.address,
            "peer registered"
        );
        self.upsert_peer(peer);
        self.upsert_user(user);
    }

    pub fn peer(&self, identity: &str) -> Option<PeerEntry> {
        self.peers.get(identity).map(|p| p.value().clone())
    }

    pub fn user(&self, identity: &str) -> Option<User> {
        self.users.get(identity).map(|u| u.value().clone())
    }

    /// Unordered snapshot of every known user.
    pub fn users(&self) -> Vec<User> {
        self.users.iter().map(|u| u.value().clone()).collect()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}
