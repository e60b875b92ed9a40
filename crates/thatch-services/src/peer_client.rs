//! Handle for issuing peer-plane calls to one remote node.
//!
//! Every handle shares a single `reqwest::Client` so connections to a peer are
//! pooled and reused after the handshake.

use std::net::SocketAddr;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use thatch_core::wire::{
    ErrorBody, ErrorKind, HandshakeRequest, HandshakeResponse, OpenChatRequest, OpenChatResponse,
    PeerSendRequest, PeerSendResponse, PEER_CHATS_PATH, PEER_HANDSHAKE_PATH, PEER_MESSAGES_PATH,
};

use crate::error::{Result, ServiceError};

/// Build the HTTP client shared by every peer handle.
pub fn build_http_client(
    dial_timeout: Duration,
    request_timeout: Duration,
) -> std::result::Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(dial_timeout)
        .timeout(request_timeout)
        .no_proxy()
        .build()
}

#[derive(Debug, Clone)]
pub struct PeerClient {
    addr: SocketAddr,
    http: reqwest::Client,
}

impl PeerClient {
    pub fn new(http: reqwest::Client, addr: SocketAddr) -> Self {
        Self { addr, http }
    }

    pub async fn handshake(&self, req: &HandshakeRequest) -> Result<HandshakeResponse> {
        self.post(PEER_HANDSHAKE_PATH, req).await
    }

    pub async fn send(&self, req: &PeerSendRequest) -> Result<PeerSendResponse> {
        self.post(PEER_MESSAGES_PATH, req).await
    }

    pub async fn open_chat(&self, req: &OpenChatRequest) -> Result<OpenChatResponse> {
        self.post(PEER_CHATS_PATH, req).await
    }

    async fn post<T: Serialize, R: DeserializeOwned>(&self, path: &str, body: &T) -> Result<R> {
        let url = format!("http://{}{}", self.addr, path);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::unreachable(self.addr, e))?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<R>()
                .await
                .map_err(|e| ServiceError::unreachable(self.addr, format!("bad response: {e}")));
        }

        // The peer answered: surface its verdict rather than a transport error.
        let body = resp.json::<ErrorBody>().await.unwrap_or_else(|_| ErrorBody {
            kind: ErrorKind::Invalid,
            message: format!("peer returned {status}"),
        });
        Err(match body.kind {
            ErrorKind::AuthenticationFailed => ServiceError::AuthenticationFailed(format!(
                "refused by {}: {}",
                self.addr, body.message
            )),
            ErrorKind::NotFound => ServiceError::NotFound {
                what: "remote record",
                key: body.message,
            },
            ErrorKind::Unreachable => ServiceError::unreachable(self.addr, body.message),
            ErrorKind::Invalid | ErrorKind::Unimplemented => {
                ServiceError::Invalid(format!("{} rejected request: {}", self.addr, body.message))
            }
        })
    }
}
