//! The node: owns identity and registries and implements every operation
//! the control plane and the peer plane expose.
//!
//! Registry access never spans a network call: each operation snapshots what
//! it needs, releases the map, then talks to peers.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thatch_core::config::VerificationMode;
use thatch_core::crypto::Identity;
use thatch_core::model::DISCRIMINATOR_SEPARATOR;
use thatch_core::wire::{
    message_payload, open_chat_payload, OpenChatRequest, OpenChatResponse, PeerSendRequest,
    PeerSendResponse, Stamp, StatusResponse,
};
use thatch_core::{Chat, User};

use crate::chat::ChatRegistry;
use crate::error::{Result, ServiceError};
use crate::peer_client::build_http_client;
use crate::registry::{PeerEntry, Registry};
use crate::replay::ReplayGuard;
use crate::verify::{verifier_for, SignatureVerifier};

/// Start-up settings for a [`Node`].
#[derive(Debug, Clone)]
pub struct NodeOptions {
    /// Display name. Empty picks [`default_display_name`].
    pub name: String,
    /// Where this node's peer plane is reachable from the subnet.
    pub advertised: SocketAddr,
    pub verification: VerificationMode,
    pub dial_timeout: Duration,
    pub request_timeout: Duration,
}

/// `$USER#abcd`, where `abcd` is the head of the identity token.
pub fn default_display_name(token: &str) -> String {
    let user = std::env::var("USER")
        .ok()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "anon".to_string());
    format!(
        "{user}{DISCRIMINATOR_SEPARATOR}{}",
        token.get(..4).unwrap_or(token)
    )
}

struct NodeInner {
    identity: Identity,
    token: String,
    name: String,
    advertised: SocketAddr,
    registry: Registry,
    chats: ChatRegistry,
    verifier: Arc<dyn SignatureVerifier>,
    replay: ReplayGuard,
    http: reqwest::Client,
}

/// Cheap to clone; every clone shares the same registries.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    pub fn new(identity: Identity, opts: NodeOptions) -> Result<Self> {
        let http = build_http_client(opts.dial_timeout, opts.request_timeout)
            .map_err(|e| ServiceError::Invalid(format!("http client: {e}")))?;
        let token = identity.token();
        let name = if opts.name.is_empty() {
            default_display_name(&token)
        } else {
            opts.name
        };

        let registry = Registry::new();
        registry.upsert_user(User::new(name.clone(), token.clone()));

        if opts.verification == VerificationMode::None {
            tracing::warn!("signature verification disabled, peers are trusted on first use");
        }

        Ok(Self {
            inner: Arc::new(NodeInner {
                identity,
                token,
                name,
                advertised: opts.advertised,
                registry,
                chats: ChatRegistry::new(),
                verifier: verifier_for(opts.verification),
                replay: ReplayGuard::default(),
                http,
            }),
        })
    }

    /// This node's identity token.
    pub fn identity(&self) -> &str {
        &self.inner.token
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn advertised(&self) -> SocketAddr {
        self.inner.advertised
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn chats(&self) -> &ChatRegistry {
        &self.inner.chats
    }

    pub fn verifier(&self) -> &dyn SignatureVerifier {
        self.inner.verifier.as_ref()
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// Hex signature over `message` with this node's key.
    pub fn sign(&self, message: &[u8]) -> String {
        self.inner.identity.sign(message)
    }

    /// Check a peer request's signature over `payload`, then, when signatures
    /// are enforced, refuse it if its stamp is stale or already used.
    pub(crate) fn authenticate(
        &self,
        signature: &str,
        payload: &[u8],
        identity: &str,
        stamp: &Stamp,
    ) -> Result<()> {
        if !self.verifier().verify(signature, payload, identity) {
            return Err(ServiceError::AuthenticationFailed(
                "invalid signature for identity".into(),
            ));
        }
        if self.verifier().mode() == VerificationMode::Ed25519 {
            self.inner.replay.admit(identity, stamp)?;
        }
        Ok(())
    }

    fn own_pair_with(&self, other: &str) -> BTreeSet<String> {
        [self.identity().to_string(), other.to_string()].into()
    }

    // ── Node-local service ───────────────────────────────────────────────────

    pub fn list_users(&self) -> Vec<User> {
        self.registry().users()
    }

    pub fn list_chats(&self) -> Vec<String> {
        self.chats().ids()
    }

    pub fn get_chat(&self, id: &str) -> Result<Chat> {
        self.chats()
            .get(id)
            .ok_or_else(|| ServiceError::not_found("chat", id))
    }

    /// Open a chat with a known peer. The remote side is asked to open the
    /// same chat id; if it cannot be reached the chat still exists locally
    /// and the remote creates it on the first message.
    pub async fn start_chat(&self, target: &str) -> Result<String> {
        if target == self.identity() {
            return Err(ServiceError::Invalid("cannot start a chat with yourself".into()));
        }
        let peer = self
            .registry()
            .peer(target)
            .ok_or_else(|| ServiceError::not_found("user", target))?;

        let chat = self.chats().create(self.own_pair_with(target));
        tracing::info!(chat = %chat.id, peer = crate::short(target), "chat started");

        let stamp = Stamp::fresh();
        let req = OpenChatRequest {
            authentication: self.identity().to_string(),
            chat_id: chat.id.clone(),
            signature: self.sign(&open_chat_payload(target, &chat.id, &stamp)),
            stamp,
        };
        if let Err(e) = peer.client.open_chat(&req).await {
            tracing::warn!(chat = %chat.id, error = %e, "remote side did not open chat");
        }

        Ok(chat.id)
    }

    /// Deliver `text` to every other member, then append it locally.
    /// Nothing is appended if any delivery fails.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<usize> {
        let chat = self.get_chat(chat_id)?;
        let recipients = chat
            .others(self.identity())
            .map(|member| {
                self.registry()
                    .peer(member)
                    .ok_or_else(|| ServiceError::not_found("peer", member.as_str()))
            })
            .collect::<Result<Vec<PeerEntry>>>()?;
        if recipients.is_empty() {
            return Err(ServiceError::Invalid(format!(
                "chat {chat_id} has no remote member"
            )));
        }

        for peer in &recipients {
            let stamp = Stamp::fresh();
            let req = PeerSendRequest {
                authentication: self.identity().to_string(),
                chat_id: Some(chat_id.to_string()),
                message: text.to_string(),
                signature: self.sign(&message_payload(
                    &peer.authentication,
                    Some(chat_id),
                    text,
                    &stamp,
                )),
                stamp,
            };
            peer.client.send(&req).await?;
        }

        self.chats().append(chat_id, self.identity(), text)
    }

    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            name: self.name().to_string(),
            id: self.identity().to_string(),
            users: self.registry().user_count(),
            peers: self.registry().peer_count(),
            chats: self.chats().len(),
            verification: self.verifier().mode().as_str().to_string(),
        }
    }

    // ── Peer-facing service ──────────────────────────────────────────────────

    /// Accept a message from another node.
    ///
    /// The message lands in the chat named by the hint when the sender is a
    /// member, else in any chat the sender belongs to, else in a new chat,
    /// but only if the sender completed a handshake with us.
    pub fn receive_message(&self, req: PeerSendRequest) -> Result<PeerSendResponse> {
        let sender = req.authentication.as_str();
        let payload = message_payload(
            self.identity(),
            req.chat_id.as_deref(),
            &req.message,
            &req.stamp,
        );
        self.authenticate(&req.signature, &payload, sender, &req.stamp)?;

        let hinted = req
            .chat_id
            .as_deref()
            .filter(|id| self.chats().has_member(id, sender));
        let chat_id = match hinted
            .map(str::to_string)
            .or_else(|| self.chats().find_by_member(sender))
        {
            Some(id) => id,
            None => self.open_inbound_chat(sender, req.chat_id.as_deref())?,
        };

        let index = self.chats().append(&chat_id, sender, &req.message)?;
        tracing::debug!(chat = %chat_id, peer = crate::short(sender), index, "message received");
        Ok(PeerSendResponse { chat_id, index })
    }

    /// Accept a peer's request to open a shared chat id.
    pub fn open_chat(&self, req: OpenChatRequest) -> Result<OpenChatResponse> {
        let sender = req.authentication.as_str();
        let payload = open_chat_payload(self.identity(), &req.chat_id, &req.stamp);
        self.authenticate(&req.signature, &payload, sender, &req.stamp)?;
        if self.registry().peer(sender).is_none() {
            return Err(ServiceError::not_found("peer", sender));
        }

        let chat = self.chats().open(&req.chat_id, self.own_pair_with(sender))?;
        tracing::info!(chat = %chat.id, peer = crate::short(sender), "chat opened by peer");
        Ok(OpenChatResponse { chat_id: chat.id })
    }

    fn open_inbound_chat(&self, sender: &str, hint: Option<&str>) -> Result<String> {
        if self.registry().peer(sender).is_none() {
            return Err(ServiceError::not_found("chat for identity", sender));
        }
        let members = self.own_pair_with(sender);
        let chat = match hint.map(|id| self.chats().open(id, members.clone())) {
            Some(Ok(chat)) => chat,
            _ => self.chats().create(members),
        };
        tracing::info!(chat = %chat.id, peer = crate::short(sender), "chat created by inbound message");
        Ok(chat.id)
    }
}
