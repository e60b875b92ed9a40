//! HTTP handlers for the control plane and the peer plane.

pub mod chats;
pub mod control;
pub mod peer;
pub mod users;

use thatch_services::Node;

/// State behind the control plane.
#[derive(Clone)]
pub struct ApiState {
    pub node: Node,
    /// Scan requests; the daemon's scan loop owns the receiver.
    pub scan_tx: tokio::sync::mpsc::UnboundedSender<()>,
    /// Shutdown broadcast sender, fired by Kill.
    pub shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

pub use chats::{handle_get_chat, handle_list_chats, handle_send_message, handle_start_chat};
pub use control::{handle_kill, handle_scan, handle_status};
pub use peer::{handle_handshake, handle_open_chat, handle_peer_message};
pub use users::handle_list_users;
