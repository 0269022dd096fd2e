//! Integration tests for WebSocket connection and messaging.

use bytes::Bytes;
use futures::SinkExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use wshub_realtime::ClientMessage;

use crate::helpers::{TestServer, next_message, next_text, wait_until};

#[tokio::test]
async fn test_directed_message_reaches_only_its_client() {
    let server = TestServer::start(4).await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;

    server.hub.send_to("bob", "for bob").await.unwrap();
    server.hub.send_to("alice", "for alice").await.unwrap();

    assert_eq!(next_text(&mut bob).await, "for bob");
    assert_eq!(next_text(&mut alice).await, "for alice");

    server.hub.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_broadcast_reaches_every_client() {
    let server = TestServer::start(4).await;
    let mut clients = Vec::new();
    for id in ["a", "b", "c"] {
        clients.push(server.connect(id).await);
    }

    server.hub.broadcast("hello everyone").await.unwrap();
    for client in &mut clients {
        assert_eq!(next_text(client).await, "hello everyone");
    }

    server.hub.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_non_utf8_payload_is_sent_as_binary() {
    let server = TestServer::start(4).await;
    let mut client = server.connect("bin").await;

    server
        .hub
        .send_to("bin", Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]))
        .await
        .unwrap();

    match next_message(&mut client).await {
        Some(Message::Binary(data)) => assert_eq!(&data[..], &[0xde, 0xad, 0xbe, 0xef]),
        other => panic!("Expected a binary message, got {other:?}"),
    }

    server.hub.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_inbound_messages_reach_handlers() {
    let server = TestServer::start(4).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    server.hub.on_message(move |message: ClientMessage| {
        let _ = tx.send(message);
    });

    let mut client = server.connect("sender").await;
    client.send(Message::text("hi hub")).await.unwrap();

    let received = rx.recv().await.unwrap();
    assert_eq!(received.client_id, "sender");
    assert_eq!(received.text(), Some("hi hub"));

    server.hub.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_capacity_is_enforced_and_freed() {
    let server = TestServer::start(2).await;
    let mut a = server.connect("a").await;
    let _b = server.connect("b").await;
    assert_eq!(server.hub.count(), 2);

    match connect_async(server.ws_url("c")).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 503),
        Err(e) => panic!("Unexpected error: {e}"),
        Ok(_) => panic!("Third client should have been refused"),
    }
    assert_eq!(server.hub.count(), 2);

    a.close(None).await.unwrap();
    let hub = server.hub.clone();
    wait_until(move || hub.count() == 1).await;

    let _c = server.connect("c").await;
    assert_eq!(server.hub.count(), 2);

    server.hub.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_duplicate_client_id_is_refused() {
    let server = TestServer::start(4).await;
    let _first = server.connect("same").await;

    match connect_async(server.ws_url("same")).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 409),
        Err(e) => panic!("Unexpected error: {e}"),
        Ok(_) => panic!("Duplicate client id should have been refused"),
    }
    assert_eq!(server.hub.count(), 1);

    server.hub.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_unregister_disconnects_client() {
    let server = TestServer::start(4).await;
    let mut client = server.connect("kicked").await;

    server.hub.unregister("kicked").await.unwrap();
    assert!(matches!(next_message(&mut client).await, Some(Message::Close(_))));
    assert!(!server.hub.is_registered("kicked"));

    server.hub.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_closes_every_client() {
    let server = TestServer::start(4).await;
    let mut one = server.connect("one").await;
    let mut two = server.connect("two").await;

    server.hub.close().await.unwrap();
    assert_eq!(server.hub.count(), 0);
    assert_eq!(server.hub.active_workers(), 0);

    for client in [&mut one, &mut two] {
        assert!(matches!(next_message(client).await, Some(Message::Close(_))));
    }

    assert!(server.hub.send_to("one", "late").await.is_err());
    server.hub.close().await.unwrap();
    server.stop().await;
}
