//! Peer-plane handlers. Each one verifies the caller's signature before
//! touching any registry.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};

use thatch_core::wire::{
    HandshakeRequest, HandshakeResponse, OpenChatRequest, OpenChatResponse, PeerSendRequest,
    PeerSendResponse,
};
use thatch_services::{handshake, Node};

use crate::error::{ApiError, Json};

pub async fn handle_handshake(
    State(node): State<Node>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Json(req): Json<HandshakeRequest>,
) -> Result<Json<HandshakeResponse>, ApiError> {
    Ok(Json(handshake::respond(&node, req, remote).await?))
}

pub async fn handle_peer_message(
    State(node): State<Node>,
    Json(req): Json<PeerSendRequest>,
) -> Result<Json<PeerSendResponse>, ApiError> {
    Ok(Json(node.receive_message(req)?))
}

pub async fn handle_open_chat(
    State(node): State<Node>,
    Json(req): Json<OpenChatRequest>,
) -> Result<Json<OpenChatResponse>, ApiError> {
    Ok(Json(node.open_chat(req)?))
}
