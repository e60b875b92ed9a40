use thatch_core::wire::{handshake_payload, HandshakeRequest, Stamp};
use thatch_services::handshake::{initiate, HandshakeOutcome};
use thatch_services::{PeerClient, ServiceError};

use crate::*;

#[tokio::test]
async fn handshake_registers_both_sides() {
    let alice = spawn_node("alice#0001", VerificationMode::Ed25519).await.unwrap();
    let bob = spawn_node("bob#0002", VerificationMode::Ed25519).await.unwrap();

    let outcome = initiate(&alice.node, bob.addr).await.unwrap();
    match outcome {
        HandshakeOutcome::Registered(user) => {
            assert_eq!(user.id, bob.node.identity());
            assert_eq!(user.name, "bob#0002");
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let b_at_a = alice.node.registry().peer(bob.node.identity()).unwrap();
    assert_eq!(b_at_a.address, bob.addr);
    let a_at_b = bob.node.registry().peer(alice.node.identity()).unwrap();
    assert_eq!(a_at_b.address, alice.addr);

    assert_eq!(
        bob.node.registry().user(alice.node.identity()).unwrap().name,
        "alice#0001"
    );
}

#[tokio::test]
async fn repeated_handshake_keeps_one_entry() {
    let alice = spawn_node("alice#0001", VerificationMode::None).await.unwrap();
    let bob = spawn_node("bob#0002", VerificationMode::None).await.unwrap();

    for _ in 0..3 {
        initiate(&alice.node, bob.addr).await.unwrap();
    }

    assert_eq!(alice.node.registry().peer_count(), 1);
    assert_eq!(bob.node.registry().peer_count(), 1);
    // Local user plus the counterpart.
    assert_eq!(alice.node.list_users().len(), 2);
    assert_eq!(bob.node.list_users().len(), 2);
}

#[tokio::test]
async fn handshake_with_self_registers_nothing() {
    let alice = spawn_node("alice#0001", VerificationMode::Ed25519).await.unwrap();

    let outcome = initiate(&alice.node, alice.addr).await.unwrap();
    assert_eq!(outcome, HandshakeOutcome::SelfContact);
    assert_eq!(alice.node.registry().peer_count(), 0);
    assert_eq!(alice.node.list_users().len(), 1);
}

#[tokio::test]
async fn forged_handshake_is_refused_without_side_effects() {
    let bob = spawn_node("bob#0002", VerificationMode::Ed25519).await.unwrap();
    let victim = Identity::generate();
    let mallory = Identity::generate();

    // Claims the victim's identity but signs with mallory's key.
    let stamp = Stamp::fresh();
    let req = HandshakeRequest {
        name: "victim#0003".into(),
        authentication: victim.token(),
        address: "127.0.0.1:9".into(),
        signature: mallory.sign(&handshake_payload(
            "victim#0003",
            &victim.token(),
            "127.0.0.1:9",
            &stamp,
        )),
        stamp,
    };
    let client = PeerClient::new(bob.node.http().clone(), bob.addr);
    let err = client.handshake(&req).await.unwrap_err();

    assert!(matches!(err, ServiceError::AuthenticationFailed(_)));
    assert_eq!(bob.node.registry().peer_count(), 0);
    assert!(bob.node.registry().user(&victim.token()).is_none());
}

#[tokio::test]
async fn dead_address_is_unreachable() {
    let alice = spawn_node("alice#0001", VerificationMode::None).await.unwrap();
    let closed = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap()
    };

    let err = initiate(&alice.node, closed).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unreachable { .. }));
    assert_eq!(alice.node.registry().peer_count(), 0);
}

/// The handshake `node` sends while sweeping, as any host on the subnet would
/// receive it.
fn sweep_handshake(node: &TestNode) -> HandshakeRequest {
    let address = node.addr.to_string();
    let stamp = Stamp::fresh();
    HandshakeRequest {
        name: node.node.name().to_string(),
        authentication: node.node.identity().to_string(),
        signature: node.node.sign(&handshake_payload(
            node.node.name(),
            node.node.identity(),
            &address,
            &stamp,
        )),
        address,
        stamp,
    }
}

#[tokio::test]
async fn relayed_handshake_cannot_repoint_a_peer() {
    let alice = spawn_node("alice#0001", VerificationMode::Ed25519).await.unwrap();
    let bob = spawn_node("bob#0002", VerificationMode::Ed25519).await.unwrap();
    let mallory = spawn_node("mallory#0003", VerificationMode::Ed25519).await.unwrap();
    initiate(&alice.node, bob.addr).await.unwrap();

    // Mallory received alice's sweep handshake and relays it to bob with her
    // own address substituted.
    let mut relayed = sweep_handshake(&alice);
    relayed.address = mallory.addr.to_string();
    let to_bob = PeerClient::new(mallory.node.http().clone(), bob.addr);
    let err = to_bob.handshake(&relayed).await.unwrap_err();
    assert!(matches!(err, ServiceError::AuthenticationFailed(_)));

    let entry = bob.node.registry().peer(alice.node.identity()).unwrap();
    assert_eq!(entry.address, alice.addr);
}

#[tokio::test]
async fn verbatim_handshake_replay_is_refused() {
    let alice = spawn_node("alice#0001", VerificationMode::Ed25519).await.unwrap();
    let bob = spawn_node("bob#0002", VerificationMode::Ed25519).await.unwrap();

    let captured = sweep_handshake(&alice);
    let to_bob = PeerClient::new(alice.node.http().clone(), bob.addr);
    to_bob.handshake(&captured).await.unwrap();

    let err = to_bob.handshake(&captured).await.unwrap_err();
    assert!(matches!(err, ServiceError::AuthenticationFailed(_)));
    assert_eq!(bob.node.registry().peer_count(), 1);
}

#[tokio::test]
async fn unspecified_return_host_is_refused_under_ed25519() {
    let alice = spawn_node("alice#0001", VerificationMode::Ed25519).await.unwrap();
    let bob = spawn_node("bob#0002", VerificationMode::Ed25519).await.unwrap();

    let address = format!("0.0.0.0:{}", alice.addr.port());
    let stamp = Stamp::fresh();
    let req = HandshakeRequest {
        name: alice.node.name().to_string(),
        authentication: alice.node.identity().to_string(),
        signature: alice.node.sign(&handshake_payload(
            alice.node.name(),
            alice.node.identity(),
            &address,
            &stamp,
        )),
        address,
        stamp,
    };
    let to_bob = PeerClient::new(alice.node.http().clone(), bob.addr);
    let err = to_bob.handshake(&req).await.unwrap_err();

    assert!(matches!(err, ServiceError::AuthenticationFailed(_)));
    assert_eq!(bob.node.registry().peer_count(), 0);
}
