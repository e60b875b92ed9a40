//! Request and response bodies for the peer plane and the control plane.
//!
//! Both planes carry JSON over HTTP/1.1. The peer plane is reachable from the
//! subnet on TCP; the control plane is bound to a local Unix socket.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::model::{Chat, User};

// ── Routes ────────────────────────────────────────────────────────────────────

pub const PEER_HANDSHAKE_PATH: &str = "/peer/handshake";
pub const PEER_MESSAGES_PATH: &str = "/peer/messages";
pub const PEER_CHATS_PATH: &str = "/peer/chats";

/// Prefix every control-plane route is nested under.
pub const CONTROL_PREFIX: &str = "/api";

// ── Defaults ──────────────────────────────────────────────────────────────────

pub const DEFAULT_SOCKET_PATH: &str = "/tmp/thatch.sock";
pub const DEFAULT_PEER_PORT: u16 = 8000;
pub const DEFAULT_DISCOVERY_PORT: u16 = 8000;
pub const DEFAULT_SUBNET_MASK: u8 = 24;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Error category shared by both planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    AuthenticationFailed,
    Unreachable,
    Invalid,
    Unimplemented,
}

/// JSON body returned with every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

// ── Signed payloads ───────────────────────────────────────────────────────────

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Freshness fields carried by every signed peer request and covered by its
/// signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    /// Unix seconds at signing time.
    pub timestamp: u64,
    /// Random hex, unique per request.
    pub nonce: String,
}

impl Stamp {
    pub fn fresh() -> Self {
        Self {
            timestamp: unix_now(),
            nonce: crypto::random_nonce(),
        }
    }
}

/// Bytes a handshake initiator signs: its identity and the return address
/// the responder will bind that identity to.
pub fn handshake_payload(
    name: &str,
    authentication: &str,
    address: &str,
    stamp: &Stamp,
) -> Vec<u8> {
    format!(
        "thatch-handshake\n{name}\n{authentication}\n{address}\n{}\n{}",
        stamp.timestamp, stamp.nonce
    )
    .into_bytes()
}

/// Bytes a handshake responder signs. Bound to the initiator's nonce, so a
/// reply only ever answers the request that asked for it.
pub fn handshake_reply_payload(name: &str, authentication: &str, request_nonce: &str) -> Vec<u8> {
    format!("thatch-handshake-reply\n{name}\n{authentication}\n{request_nonce}").into_bytes()
}

/// Bytes a node signs when sending `message` to `recipient`.
pub fn message_payload(
    recipient: &str,
    chat_id: Option<&str>,
    message: &str,
    stamp: &Stamp,
) -> Vec<u8> {
    format!(
        "thatch-message\n{recipient}\n{}\n{}\n{}\n{message}",
        chat_id.unwrap_or(""),
        stamp.timestamp,
        stamp.nonce
    )
    .into_bytes()
}

/// Bytes a node signs when asking `recipient` to open a chat.
pub fn open_chat_payload(recipient: &str, chat_id: &str, stamp: &Stamp) -> Vec<u8> {
    format!(
        "thatch-open-chat\n{recipient}\n{chat_id}\n{}\n{}",
        stamp.timestamp, stamp.nonce
    )
    .into_bytes()
}

// ── Peer plane ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// Initiator's display name.
    pub name: String,
    /// Initiator's identity token.
    pub authentication: String,
    /// `host:port` where the initiator's peer plane accepts return traffic.
    pub address: String,
    #[serde(flatten)]
    pub stamp: Stamp,
    /// Hex signature over [`handshake_payload`].
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeResponse {
    pub name: String,
    pub authentication: String,
    /// Hex signature over [`handshake_reply_payload`].
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerSendRequest {
    pub authentication: String,
    /// Chat id on the sender's side. Both sides share ids once a chat is open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    pub message: String,
    #[serde(flatten)]
    pub stamp: Stamp,
    /// Hex signature over [`message_payload`].
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerSendResponse {
    pub chat_id: String,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenChatRequest {
    pub authentication: String,
    pub chat_id: String,
    #[serde(flatten)]
    pub stamp: Stamp,
    /// Hex signature over [`open_chat_payload`].
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenChatResponse {
    pub chat_id: String,
}

// ── Control plane ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatsResponse {
    pub chat_ids: Vec<String>,
}

pub type ChatResponse = Chat;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartChatRequest {
    /// Identity token of the user to talk to.
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartChatResponse {
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub chat_id: String,
    /// Position of the message within the chat.
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub queued: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub name: String,
    pub id: String,
    pub users: usize,
    pub peers: usize,
    pub chats: usize,
    pub verification: String,
}
