//! Identity exchange between two nodes over the peer plane.
//!
//! The initiator posts its name, identity token, return address, a fresh
//! stamp and a signature over all of them; the responder verifies, registers
//! the initiator at the signed address and answers with its own identity,
//! signed together with the initiator's nonce. The initiator verifies that
//! answer before registering the responder. After a successful exchange each
//! side holds a reusable client handle for the other.

use std::net::SocketAddr;

use thatch_core::config::VerificationMode;
use thatch_core::wire::{
    handshake_payload, handshake_reply_payload, HandshakeRequest, HandshakeResponse, Stamp,
};
use thatch_core::User;

use crate::error::{Result, ServiceError};
use crate::node::Node;
use crate::peer_client::PeerClient;
use crate::registry::PeerEntry;

/// What a completed handshake produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// The counterpart is now in the registry.
    Registered(User),
    /// The address answered with this node's own identity.
    SelfContact,
}

// ── Initiator ─────────────────────────────────────────────────────────────────

pub async fn initiate(node: &Node, peer_addr: SocketAddr) -> Result<HandshakeOutcome> {
    tracing::trace!(%peer_addr, "initiating handshake");

    let client = PeerClient::new(node.http().clone(), peer_addr);
    let address = node.advertised().to_string();
    let stamp = Stamp::fresh();
    let req = HandshakeRequest {
        name: node.name().to_string(),
        authentication: node.identity().to_string(),
        signature: node.sign(&handshake_payload(
            node.name(),
            node.identity(),
            &address,
            &stamp,
        )),
        address,
        stamp,
    };

    let resp = client.handshake(&req).await?;

    if !node.verifier().verify(
        &resp.signature,
        &handshake_reply_payload(&resp.name, &resp.authentication, &req.stamp.nonce),
        &resp.authentication,
    ) {
        return Err(ServiceError::AuthenticationFailed(format!(
            "handshake reply from {peer_addr} carries an invalid signature"
        )));
    }

    if resp.authentication == node.identity() {
        tracing::debug!(%peer_addr, "handshake reached ourselves, not registering");
        return Ok(HandshakeOutcome::SelfContact);
    }

    let user = User::new(resp.name.clone(), resp.authentication.clone());
    node.registry().register(
        PeerEntry {
            address: peer_addr,
            authentication: resp.authentication,
            client,
        },
        resp.name,
    );
    tracing::info!(%peer_addr, "handshake complete (initiator)");
    Ok(HandshakeOutcome::Registered(user))
}

// ── Responder ─────────────────────────────────────────────────────────────────

/// Handle an inbound handshake. `remote` is the TCP source of the request and
/// fills in the host when the advertised address is unspecified. Under
/// `ed25519` an unspecified host is refused.
pub async fn respond(
    node: &Node,
    req: HandshakeRequest,
    remote: SocketAddr,
) -> Result<HandshakeResponse> {
    tracing::debug!(%remote, "handshake request");

    let payload = handshake_payload(&req.name, &req.authentication, &req.address, &req.stamp);
    node.authenticate(&req.signature, &payload, &req.authentication, &req.stamp)?;

    let allow_unspecified = node.verifier().mode() == VerificationMode::None;
    let peer_addr = resolve_return_address(&req.address, remote, allow_unspecified).await?;

    if req.authentication == node.identity() {
        tracing::debug!(%remote, "handshake from ourselves, not registering");
    } else {
        node.registry().register(
            PeerEntry {
                address: peer_addr,
                authentication: req.authentication,
                client: PeerClient::new(node.http().clone(), peer_addr),
            },
            req.name,
        );
        tracing::info!(%peer_addr, "handshake complete (responder)");
    }

    Ok(HandshakeResponse {
        name: node.name().to_string(),
        authentication: node.identity().to_string(),
        signature: node.sign(&handshake_reply_payload(
            node.name(),
            node.identity(),
            &req.stamp.nonce,
        )),
    })
}

async fn resolve_return_address(
    address: &str,
    remote: SocketAddr,
    allow_unspecified: bool,
) -> Result<SocketAddr> {
    let mut resolved = tokio::net::lookup_host(address)
        .await
        .map_err(|e| ServiceError::Invalid(format!("cannot resolve {address}: {e}")))?
        .next()
        .ok_or_else(|| ServiceError::Invalid(format!("{address} resolved to nothing")))?;

    if resolved.ip().is_unspecified() {
        if !allow_unspecified {
            return Err(ServiceError::AuthenticationFailed(format!(
                "signed return address {address} does not name a host"
            )));
        }
        resolved.set_ip(remote.ip());
    }
    Ok(resolved)
}
