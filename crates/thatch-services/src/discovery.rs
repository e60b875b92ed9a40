//! Subnet sweep.
//!
//! Enumerates every IPv4 address in the local prefix, network and broadcast
//! addresses included, and attempts a handshake with each one on the
//! discovery port. Every attempt is its own task with its own deadline; a
//! failed attempt is logged and dropped without affecting the others.
//!
//! A full /24 sweep is 256 concurrent dials. There is no bound on fan-out,
//! which keeps the sweep simple and is only sensible on small local subnets.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::task::{JoinHandle, JoinSet};

use crate::error::{Result, ServiceError};
use crate::handshake::{self, HandshakeOutcome};
use crate::node::Node;

/// Find the IPv4 address of the interface holding the default route.
///
/// Connecting a UDP socket sends nothing; it only makes the kernel pick a
/// source address.
pub fn probe_local_ipv4() -> std::io::Result<Ipv4Addr> {
    let probe = std::net::UdpSocket::bind("0.0.0.0:0")?;
    probe.connect("8.8.8.8:80")?;
    match probe.local_addr()? {
        SocketAddr::V4(v4) => Ok(*v4.ip()),
        SocketAddr::V6(_) => Err(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "expected an IPv4 local address",
        )),
    }
}

// ── Subnet enumeration ────────────────────────────────────────────────────────

/// An IPv4 prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subnet {
    network: u32,
    prefix_len: u8,
}

impl Subnet {
    /// The prefix of length `prefix_len` containing `addr`.
    pub fn containing(addr: Ipv4Addr, prefix_len: u8) -> Result<Self> {
        if prefix_len > 32 {
            return Err(ServiceError::Invalid(format!(
                "subnet mask /{prefix_len} exceeds 32"
            )));
        }
        let mask = if prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - prefix_len)
        };
        Ok(Self {
            network: u32::from(addr) & mask,
            prefix_len,
        })
    }

    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.network)
    }

    /// Number of addresses in the prefix.
    pub fn size(&self) -> u64 {
        1u64 << (32 - self.prefix_len as u32)
    }

    /// Every address in the prefix, lowest first.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        let start = self.network as u64;
        (start..start + self.size()).map(|a| Ipv4Addr::from(a as u32))
    }
}

impl std::fmt::Display for Subnet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix_len)
    }
}

// ── Sweep ─────────────────────────────────────────────────────────────────────

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub attempted: usize,
    pub registered: usize,
    pub self_contacts: usize,
    pub failed: usize,
}

/// Attempt a handshake with every host on `port`, one task per host.
///
/// Shutdown is checked before each spawn; tasks already started run to
/// completion or to `attempt_timeout`.
pub async fn sweep(
    node: Node,
    hosts: impl Iterator<Item = Ipv4Addr>,
    port: u16,
    attempt_timeout: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> SweepSummary {
    let mut summary = SweepSummary::default();
    let mut attempts = JoinSet::new();

    for host in hosts {
        if !matches!(shutdown.try_recv(), Err(TryRecvError::Empty)) {
            tracing::info!("sweep interrupted by shutdown");
            break;
        }
        let addr = SocketAddr::V4(SocketAddrV4::new(host, port));
        let node = node.clone();
        summary.attempted += 1;
        attempts.spawn(async move {
            match tokio::time::timeout(attempt_timeout, handshake::initiate(&node, addr)).await {
                Ok(Ok(outcome)) => Some(outcome),
                Ok(Err(e)) => {
                    tracing::debug!(%addr, error = %e, "handshake attempt failed");
                    None
                }
                Err(_) => {
                    tracing::debug!(%addr, "handshake attempt timed out");
                    None
                }
            }
        });
    }

    while let Some(joined) = attempts.join_next().await {
        match joined {
            Ok(Some(HandshakeOutcome::Registered(_))) => summary.registered += 1,
            Ok(Some(HandshakeOutcome::SelfContact)) => summary.self_contacts += 1,
            Ok(None) => summary.failed += 1,
            Err(e) => {
                tracing::warn!(error = %e, "handshake task panicked");
                summary.failed += 1;
            }
        }
    }

    summary
}

/// Whether a trigger started a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepTrigger {
    Started,
    /// A sweep is already in flight; its registrations stand.
    AlreadyRunning,
}

/// Owns the background sweep and coalesces overlapping scan requests.
#[derive(Clone)]
pub struct Sweeper {
    node: Node,
    subnet: Subnet,
    port: u16,
    attempt_timeout: Duration,
    shutdown: broadcast::Sender<()>,
    current: Arc<Mutex<Option<JoinHandle<SweepSummary>>>>,
}

impl Sweeper {
    pub fn new(
        node: Node,
        subnet: Subnet,
        port: u16,
        attempt_timeout: Duration,
        shutdown: broadcast::Sender<()>,
    ) -> Self {
        Self {
            node,
            subnet,
            port,
            attempt_timeout,
            shutdown,
            current: Arc::new(Mutex::new(None)),
        }
    }

    pub fn subnet(&self) -> Subnet {
        self.subnet
    }

    /// Launch a sweep in the background unless one is still running.
    pub fn trigger(&self) -> SweepTrigger {
        let mut current = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if current.as_ref().is_some_and(|h| !h.is_finished()) {
            tracing::info!(subnet = %self.subnet, "sweep already in flight, ignoring scan request");
            return SweepTrigger::AlreadyRunning;
        }

        let node = self.node.clone();
        let subnet = self.subnet;
        let port = self.port;
        let attempt_timeout = self.attempt_timeout;
        let shutdown = self.shutdown.subscribe();

        tracing::info!(%subnet, port, hosts = subnet.size(), "sweep starting");
        *current = Some(tokio::spawn(async move {
            let summary = sweep(node, subnet.hosts(), port, attempt_timeout, shutdown).await;
            tracing::info!(
                %subnet,
                attempted = summary.attempted,
                registered = summary.registered,
                failed = summary.failed,
                "sweep finished"
            );
            summary
        }));
        SweepTrigger::Started
    }

    /// Wait for the in-flight sweep, if any.
    pub async fn wait(&self) -> Option<SweepSummary> {
        let handle = match self.current.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }?;
        handle.await.ok()
    }
}
