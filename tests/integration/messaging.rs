use thatch_core::crypto::Identity;
use thatch_core::wire::{message_payload, PeerSendRequest, Stamp};
use thatch_services::handshake::initiate;
use thatch_services::{PeerClient, ServiceError};

use crate::*;

async fn paired(verification: VerificationMode) -> (TestNode, TestNode) {
    let alice = spawn_node("alice#0001", verification).await.unwrap();
    let bob = spawn_node("bob#0002", verification).await.unwrap();
    initiate(&alice.node, bob.addr).await.unwrap();
    (alice, bob)
}

fn texts(node: &Node, chat_id: &str) -> Vec<(String, String)> {
    node.get_chat(chat_id)
        .unwrap()
        .messages
        .into_iter()
        .map(|m| (m.sender, m.text))
        .collect()
}

#[tokio::test]
async fn start_chat_opens_the_same_chat_on_both_nodes() {
    let (alice, bob) = paired(VerificationMode::Ed25519).await;

    let chat_id = alice.node.start_chat(bob.node.identity()).await.unwrap();

    let remote = bob.node.get_chat(&chat_id).unwrap();
    assert!(remote.has_member(alice.node.identity()));
    assert!(remote.has_member(bob.node.identity()));
    assert!(remote.messages.is_empty());
}

#[tokio::test]
async fn conversation_flows_both_ways_in_order() {
    let (alice, bob) = paired(VerificationMode::Ed25519).await;
    let a = alice.node.identity().to_string();
    let b = bob.node.identity().to_string();

    let chat_id = alice.node.start_chat(&b).await.unwrap();
    assert_eq!(alice.node.send_message(&chat_id, "hi bob").await.unwrap(), 0);
    assert_eq!(bob.node.send_message(&chat_id, "hi alice").await.unwrap(), 1);
    assert_eq!(alice.node.send_message(&chat_id, "how are you").await.unwrap(), 2);

    let expected = vec![
        (a.clone(), "hi bob".to_string()),
        (b.clone(), "hi alice".to_string()),
        (a, "how are you".to_string()),
    ];
    assert_eq!(texts(&alice.node, &chat_id), expected);
    assert_eq!(texts(&bob.node, &chat_id), expected);
}

#[tokio::test]
async fn control_plane_drives_a_conversation() {
    let (alice, bob) = paired(VerificationMode::None).await;

    let (status, users) = control(&alice.node, "GET", "/api/users", None).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users["users"].as_array().unwrap().len(), 2);

    let (status, started) = control(
        &alice.node,
        "POST",
        "/api/chats",
        Some(serde_json::json!({ "target": bob.node.identity() })),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    let chat_id = started["chat_id"].as_str().unwrap().to_string();

    let (status, sent) = control(
        &alice.node,
        "POST",
        &format!("/api/chats/{chat_id}/messages"),
        Some(serde_json::json!({ "text": "over the wire" })),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["index"], 0);

    let (status, chat) = control(&bob.node, "GET", &format!("/api/chats/{chat_id}"), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chat["messages"][0]["text"], "over the wire");
    assert_eq!(chat["messages"][0]["sender"], alice.node.identity());

    let (_, chats) = control(&bob.node, "GET", "/api/chats", None).await.unwrap();
    assert_eq!(chats["chat_ids"], serde_json::json!([chat_id]));
}

#[tokio::test]
async fn tampered_message_is_rejected_and_not_stored() {
    let (alice, bob) = paired(VerificationMode::Ed25519).await;
    let chat_id = alice.node.start_chat(bob.node.identity()).await.unwrap();

    let stamp = Stamp::fresh();
    let req = PeerSendRequest {
        authentication: alice.node.identity().to_string(),
        chat_id: Some(chat_id.clone()),
        message: "tampered".into(),
        signature: alice.node.sign(&message_payload(
            bob.node.identity(),
            Some(&chat_id),
            "original",
            &stamp,
        )),
        stamp,
    };
    let client = PeerClient::new(alice.node.http().clone(), bob.addr);
    let err = client.send(&req).await.unwrap_err();

    assert!(matches!(err, ServiceError::AuthenticationFailed(_)));
    assert!(bob.node.get_chat(&chat_id).unwrap().messages.is_empty());
}

#[tokio::test]
async fn stranger_cannot_open_a_chat_by_messaging() {
    let bob = spawn_node("bob#0002", VerificationMode::Ed25519).await.unwrap();
    let stranger = Identity::generate();

    let stamp = Stamp::fresh();
    let req = PeerSendRequest {
        authentication: stranger.token(),
        chat_id: None,
        message: "hello?".into(),
        signature: stranger.sign(&message_payload(bob.node.identity(), None, "hello?", &stamp)),
        stamp,
    };
    let client = PeerClient::new(bob.node.http().clone(), bob.addr);
    let err = client.send(&req).await.unwrap_err();

    assert!(matches!(err, ServiceError::NotFound { .. }));
    assert!(bob.node.list_chats().is_empty());
}

#[tokio::test]
async fn restarted_peer_is_updated_in_place() {
    let alice = spawn_node("alice#0001", VerificationMode::Ed25519).await.unwrap();
    let key_path =
        std::env::temp_dir().join(format!("thatch-restart-{}.key", std::process::id()));
    let _ = std::fs::remove_file(&key_path);

    let key = Identity::load_or_create(&key_path).unwrap();
    let bob = spawn_node_with(key, "bob#0002", VerificationMode::Ed25519).await.unwrap();
    initiate(&alice.node, bob.addr).await.unwrap();
    let bob_id = bob.node.identity().to_string();
    drop(bob);

    let bob = spawn_node_with(
        Identity::load_or_create(&key_path).unwrap(),
        "bob#0002",
        VerificationMode::Ed25519,
    )
    .await
    .unwrap();
    let _ = std::fs::remove_file(&key_path);
    assert_eq!(bob.node.identity(), bob_id);
    initiate(&alice.node, bob.addr).await.unwrap();

    assert_eq!(alice.node.registry().peer_count(), 1);
    assert_eq!(alice.node.registry().peer(&bob_id).unwrap().address, bob.addr);
}

#[tokio::test]
async fn concurrent_sends_from_both_ends_lose_nothing() {
    let (alice, bob) = paired(VerificationMode::Ed25519).await;
    let chat_id = alice.node.start_chat(bob.node.identity()).await.unwrap();

    let from_alice = async {
        for i in 0..10 {
            alice.node.send_message(&chat_id, &format!("a{i}")).await.unwrap();
        }
    };
    let from_bob = async {
        for i in 0..10 {
            bob.node.send_message(&chat_id, &format!("b{i}")).await.unwrap();
        }
    };
    tokio::join!(from_alice, from_bob);

    for node in [&alice.node, &bob.node] {
        let log = texts(node, &chat_id);
        assert_eq!(log.len(), 20);
        for (sender, prefix) in [(alice.node.identity(), 'a'), (bob.node.identity(), 'b')] {
            let sent: Vec<String> = log
                .iter()
                .filter(|(s, _)| s == sender)
                .map(|(_, t)| t.clone())
                .collect();
            let expected: Vec<String> = (0..10).map(|i| format!("{prefix}{i}")).collect();
            assert_eq!(sent, expected);
        }
    }
}

#[tokio::test]
async fn message_captured_for_one_node_is_refused_by_another() {
    let (alice, bob) = paired(VerificationMode::Ed25519).await;
    let carol = spawn_node("carol#0003", VerificationMode::Ed25519).await.unwrap();
    initiate(&alice.node, carol.addr).await.unwrap();

    let stamp = Stamp::fresh();
    let for_bob = PeerSendRequest {
        authentication: alice.node.identity().to_string(),
        chat_id: None,
        message: "meet at noon".into(),
        signature: alice.node.sign(&message_payload(
            bob.node.identity(),
            None,
            "meet at noon",
            &stamp,
        )),
        stamp,
    };
    let to_carol = PeerClient::new(bob.node.http().clone(), carol.addr);
    let err = to_carol.send(&for_bob).await.unwrap_err();

    assert!(matches!(err, ServiceError::AuthenticationFailed(_)));
    assert!(carol.node.list_chats().is_empty());
}
