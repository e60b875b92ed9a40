pub mod error;
pub mod handlers;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::broadcast;

use thatch_core::wire::{CONTROL_PREFIX, PEER_CHATS_PATH, PEER_HANDSHAKE_PATH, PEER_MESSAGES_PATH};
use thatch_services::Node;

pub use error::ApiError;
pub use handlers::ApiState;

/// Routes served to the local terminal client.
pub fn control_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/users", get(handlers::handle_list_users))
        .route(
            "/chats",
            get(handlers::handle_list_chats).post(handlers::handle_start_chat),
        )
        .route("/chats/{id}", get(handlers::handle_get_chat))
        .route("/chats/{id}/messages", post(handlers::handle_send_message))
        .route("/scan", post(handlers::handle_scan))
        .route("/kill", post(handlers::handle_kill))
        .route("/status", get(handlers::handle_status))
        .with_state(state);

    Router::new()
        .nest(CONTROL_PREFIX, api_routes)
        .fallback(error::unimplemented)
}

/// Routes served to other nodes.
pub fn peer_router(node: Node) -> Router {
    Router::new()
        .route(PEER_HANDSHAKE_PATH, post(handlers::handle_handshake))
        .route(PEER_MESSAGES_PATH, post(handlers::handle_peer_message))
        .route(PEER_CHATS_PATH, post(handlers::handle_open_chat))
        .fallback(error::unimplemented)
        .with_state(node)
}

async fn wait_for_shutdown(mut shutdown: broadcast::Receiver<()>) {
    let _ = shutdown.recv().await;
}

/// Serve the control plane until shutdown fires.
pub async fn serve_control(
    listener: UnixListener,
    state: ApiState,
    shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = control_router(state);
    tracing::info!(addr = ?listener.local_addr()?, "control plane listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown))
        .await?;
    tracing::info!("control plane stopped");
    Ok(())
}

/// Serve the peer plane until shutdown fires.
pub async fn serve_peer(
    listener: TcpListener,
    node: Node,
    shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = peer_router(node);
    tracing::info!(addr = %listener.local_addr()?, "peer plane listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(wait_for_shutdown(shutdown))
    .await?;
    tracing::info!("peer plane stopped");
    Ok(())
}
