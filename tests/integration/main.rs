//! thatch integration test harness.
//!
//! Every test starts its own in-process nodes on loopback with ephemeral
//! ports, so tests run in parallel without sharing state. Each node serves
//! the real peer plane over TCP; control-plane calls go through the axum
//! router in process.
//!
//!   cargo test --test integration

mod discovery;
mod handshake;
mod messaging;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceExt;

use thatch_core::config::VerificationMode;
use thatch_core::crypto::Identity;
use thatch_services::{Node, NodeOptions};

// ── Harness ───────────────────────────────────────────────────────────────────

/// A node serving its peer plane on 127.0.0.1. Dropping it stops the server.
pub struct TestNode {
    pub node: Node,
    pub addr: SocketAddr,
    shutdown: broadcast::Sender<()>,
}

impl TestNode {
    /// Receiver that fires when this node is dropped.
    pub fn shutdown_signal(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }
}

impl Drop for TestNode {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

pub async fn spawn_node(name: &str, verification: VerificationMode) -> Result<TestNode> {
    spawn_node_with(Identity::generate(), name, verification).await
}

pub async fn spawn_node_with(
    identity: Identity,
    name: &str,
    verification: VerificationMode,
) -> Result<TestNode> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let node = Node::new(
        identity,
        NodeOptions {
            name: name.to_string(),
            advertised: addr,
            verification,
            dial_timeout: Duration::from_millis(500),
            request_timeout: Duration::from_secs(2),
        },
    )?;

    let (shutdown, _) = broadcast::channel(1);
    tokio::spawn(thatch_api::serve_peer(
        listener,
        node.clone(),
        shutdown.subscribe(),
    ));

    Ok(TestNode {
        node,
        addr,
        shutdown,
    })
}

/// Call a node's control plane in process. Returns the status and JSON body.
pub async fn control(
    node: &Node,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Result<(StatusCode, serde_json::Value)> {
    let (scan_tx, _scan_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, _) = broadcast::channel(1);
    let app = thatch_api::control_router(thatch_api::ApiState {
        node: node.clone(),
        scan_tx,
        shutdown_tx,
    });

    let req = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(json) => req
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))?,
        None => req.body(Body::empty())?,
    };
    let resp = app.oneshot(req).await?;
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}
