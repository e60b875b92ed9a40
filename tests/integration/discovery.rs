use std::net::Ipv4Addr;

use thatch_services::{sweep, Subnet};

use crate::*;

#[tokio::test]
async fn sweep_finds_node_on_loopback_subnet() {
    let alice = spawn_node("alice#0001", VerificationMode::Ed25519).await.unwrap();
    let bob = spawn_node("bob#0002", VerificationMode::Ed25519).await.unwrap();

    let subnet = Subnet::containing(Ipv4Addr::LOCALHOST, 30).unwrap();
    let summary = sweep(
        alice.node.clone(),
        subnet.hosts(),
        bob.addr.port(),
        Duration::from_secs(3),
        alice.shutdown_signal(),
    )
    .await;

    assert_eq!(summary.attempted, 4);
    assert_eq!(summary.registered, 1);
    assert_eq!(summary.failed, 3);

    assert!(alice.node.registry().peer(bob.node.identity()).is_some());
    assert!(bob.node.registry().peer(alice.node.identity()).is_some());
}

#[tokio::test]
async fn sweep_reaching_itself_registers_nothing() {
    let alice = spawn_node("alice#0001", VerificationMode::None).await.unwrap();

    let subnet = Subnet::containing(Ipv4Addr::LOCALHOST, 32).unwrap();
    let summary = sweep(
        alice.node.clone(),
        subnet.hosts(),
        alice.addr.port(),
        Duration::from_secs(3),
        alice.shutdown_signal(),
    )
    .await;

    assert_eq!(summary.self_contacts, 1);
    assert_eq!(summary.registered, 0);
    assert_eq!(alice.node.registry().peer_count(), 0);
    assert_eq!(alice.node.list_users().len(), 1);
}

#[tokio::test]
async fn sweep_of_silent_subnet_completes_empty() {
    let alice = spawn_node("alice#0001", VerificationMode::None).await.unwrap();
    let closed = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };

    let subnet = Subnet::containing(Ipv4Addr::LOCALHOST, 28).unwrap();
    let summary = tokio::time::timeout(
        Duration::from_secs(10),
        sweep(
            alice.node.clone(),
            subnet.hosts(),
            closed,
            Duration::from_secs(3),
            alice.shutdown_signal(),
        ),
    )
    .await
    .unwrap();

    assert_eq!(summary.attempted, 16);
    assert_eq!(summary.registered, 0);
    assert_eq!(alice.node.list_users().len(), 1);
}
