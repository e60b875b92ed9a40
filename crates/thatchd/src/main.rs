//! thatchd: thatch local-network chat daemon.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;

use thatch_core::config::ThatchConfig;
use thatch_core::crypto::Identity;
use thatch_services::{probe_local_ipv4, Node, NodeOptions, Subnet, Sweeper};

mod control_socket;
mod scan;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load config
    if let Err(e) = ThatchConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = ThatchConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        ThatchConfig::default()
    });

    // Identity
    let keypair_path = &config.identity.keypair_path;
    let identity = Identity::load_or_create(keypair_path)
        .with_context(|| format!("failed to load identity from {}", keypair_path.display()))?;

    // Local address
    let local_ip: Ipv4Addr = if config.network.interface_addr.is_empty() {
        probe_local_ipv4().context("failed to probe local IPv4 address")?
    } else {
        config
            .network
            .interface_addr
            .parse()
            .with_context(|| format!("bad interface_addr {:?}", config.network.interface_addr))?
    };
    tracing::info!(addr = %local_ip, "local address");

    // Peer plane listener
    let peer_listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.network.peer_port))
        .await
        .with_context(|| format!("failed to bind peer port {}", config.network.peer_port))?;
    let advertised = SocketAddr::from((local_ip, peer_listener.local_addr()?.port()));

    let node = Node::new(
        identity,
        NodeOptions {
            name: config.identity.name.clone(),
            advertised,
            verification: config.auth.verification,
            dial_timeout: config.network.dial_timeout(),
            request_timeout: config.network.request_timeout(),
        },
    )?;
    tracing::info!(name = node.name(), id = node.identity(), %advertised, "node ready");

    // Control plane listener
    let socket_path = config.control.socket_path.clone();
    let control_listener = control_socket::bind(&socket_path)?;

    // Shutdown and scan channels. Every receiver is subscribed before any
    // task that can fire shutdown starts.
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let (scan_tx, scan_rx) = mpsc::unbounded_channel::<()>();
    let mut shutdown_rx = shutdown_tx.subscribe();

    // Sweeper
    let subnet = Subnet::containing(local_ip, config.network.subnet_mask)?;
    let sweeper = Sweeper::new(
        node.clone(),
        subnet,
        config.network.discovery_port,
        config.network.request_timeout(),
        shutdown_tx.clone(),
    );
    let scan_task = tokio::spawn(scan::run(sweeper, scan_rx, shutdown_tx.subscribe()));

    // Servers
    let mut servers = JoinSet::new();
    servers.spawn(thatch_api::serve_control(
        control_listener,
        thatch_api::ApiState {
            node: node.clone(),
            scan_tx: scan_tx.clone(),
            shutdown_tx: shutdown_tx.clone(),
        },
        shutdown_tx.subscribe(),
    ));
    servers.spawn(thatch_api::serve_peer(
        peer_listener,
        node.clone(),
        shutdown_tx.subscribe(),
    ));

    // Ctrl-C
    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received");
                let _ = shutdown_tx.send(());
            }
        });
    }

    if config.network.scan_on_startup {
        let _ = scan_tx.send(());
    }

    // ── Wait for exit ────────────────────────────────────────────────────────

    tokio::select! {
        _ = shutdown_rx.recv()         => tracing::info!("shutting down"),
        Some(r) = servers.join_next()  => tracing::error!("server exited: {:?}", r),
    }
    let _ = shutdown_tx.send(());

    let drain = async {
        while let Some(r) = servers.join_next().await {
            match r {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "server stopped with error"),
                Err(e) => tracing::warn!(error = %e, "server task failed"),
            }
        }
    };
    if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
        tracing::warn!("servers did not drain in time");
    }
    scan_task.abort();

    control_socket::remove(&socket_path);
    tracing::info!(
        users = node.registry().user_count(),
        chats = node.chats().len(),
        "thatchd stopped"
    );
    Ok(())
}
