//! Integration tests for the chat relay.
//!
//! These tests spin up a real server and connect WebSocket clients to
//! verify room membership, typing state, read receipts, and message
//! pass-through work correctly.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use habitz_server::{app, AppState, Config, Database, Mailer, RelayState};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start a test server on a random available port
async fn start_test_server() -> (u16, Arc<AppState>, tokio::task::JoinHandle<()>) {
    let state = Arc::new(AppState {
        config: Config {
            port: 0,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            database_path: ":memory:".to_string(),
            smtp: None,
        },
        db: Database::open_in_memory().unwrap(),
        relay: RelayState::new(),
        mailer: Mailer::disabled(),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = app(state.clone());
    let handle = tokio::spawn(async move {
        axum::serve(listener, server).await.unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (port, state, handle)
}

fn seed_chat(state: &AppState, chat_id: &str) {
    let conn = state.db.0.lock().unwrap();
    conn.execute(
        "INSERT INTO chats (id, created_at, updated_at) VALUES (?1, 0, 0)",
        [chat_id],
    )
    .unwrap();
}

fn seed_message(state: &AppState, chat_id: &str, message_id: &str, sender_id: &str) {
    let conn = state.db.0.lock().unwrap();
    conn.execute(
        "INSERT INTO messages (id, chat_id, sender_id, content, created_at)
         VALUES (?1, ?2, ?3, 'hello', 0)",
        [message_id, chat_id, sender_id],
    )
    .unwrap();
}

async fn connect_client(port: u16) -> WsClient {
    let url = format!("ws://127.0.0.1:{}/ws", port);
    let (ws_stream, _) = connect_async(&url).await.expect("Failed to connect");
    ws_stream
}

/// Join has no acknowledgement; give the server a moment to register
/// the membership before other clients start emitting.
async fn join_chat(client: &mut WsClient, chat_id: &str) {
    let event = json!({ "type": "join-chat", "chatId": chat_id });
    client
        .send(Message::Text(event.to_string().into()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
}

async fn send_event(client: &mut WsClient, event: Value) {
    client
        .send(Message::Text(event.to_string().into()))
        .await
        .unwrap();
}

async fn next_broadcast(client: &mut WsClient) -> Value {
    let msg = timeout(Duration::from_secs(5), client.next())
        .await
        .expect("Timeout waiting for broadcast")
        .expect("Stream closed")
        .expect("Read error");

    match msg {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("Expected text message, got {:?}", other),
    }
}

async fn assert_no_broadcast(client: &mut WsClient) {
    assert!(
        timeout(Duration::from_millis(300), client.next())
            .await
            .is_err(),
        "Expected no broadcast"
    );
}

#[tokio::test]
async fn test_typing_started_broadcast_sequence() {
    let (port, state, server_handle) = start_test_server().await;
    seed_chat(&state, "c1");

    let mut alice = connect_client(port).await;
    let mut bob = connect_client(port).await;
    join_chat(&mut alice, "c1").await;
    join_chat(&mut bob, "c1").await;

    send_event(
        &mut alice,
        json!({ "type": "typing-started", "chatId": "c1", "userId": "u1" }),
    )
    .await;

    let update = next_broadcast(&mut bob).await;
    assert_eq!(update["type"], "typing-update");
    assert_eq!(update["typingUsers"], json!(["u1"]));

    send_event(
        &mut bob,
        json!({ "type": "typing-started", "chatId": "c1", "userId": "u2" }),
    )
    .await;

    let update = next_broadcast(&mut bob).await;
    assert_eq!(update["typingUsers"], json!(["u1", "u2"]));

    // The sender's own connection observes the same sequence.
    let first = next_broadcast(&mut alice).await;
    let second = next_broadcast(&mut alice).await;
    assert_eq!(first["typingUsers"], json!(["u1"]));
    assert_eq!(second["typingUsers"], json!(["u1", "u2"]));

    server_handle.abort();
}

#[tokio::test]
async fn test_duplicate_typing_started_is_not_rebroadcast() {
    let (port, state, server_handle) = start_test_server().await;
    seed_chat(&state, "c1");

    let mut client = connect_client(port).await;
    join_chat(&mut client, "c1").await;

    let event = json!({ "type": "typing-started", "chatId": "c1", "userId": "u1" });
    send_event(&mut client, event.clone()).await;
    let update = next_broadcast(&mut client).await;
    assert_eq!(update["typingUsers"], json!(["u1"]));

    send_event(&mut client, event).await;
    assert_no_broadcast(&mut client).await;

    server_handle.abort();
}

#[tokio::test]
async fn test_typing_stopped_for_absent_user_broadcasts_unchanged_set() {
    let (port, state, server_handle) = start_test_server().await;
    seed_chat(&state, "c1");

    let mut client = connect_client(port).await;
    join_chat(&mut client, "c1").await;

    send_event(
        &mut client,
        json!({ "type": "typing-started", "chatId": "c1", "userId": "u1" }),
    )
    .await;
    let _ = next_broadcast(&mut client).await;

    send_event(
        &mut client,
        json!({ "type": "typing-stopped", "chatId": "c1", "userId": "u9" }),
    )
    .await;
    let update = next_broadcast(&mut client).await;
    assert_eq!(update["type"], "typing-update");
    assert_eq!(update["typingUsers"], json!(["u1"]));

    server_handle.abort();
}

#[tokio::test]
async fn test_typing_stopped_removes_user() {
    let (port, state, server_handle) = start_test_server().await;
    seed_chat(&state, "c1");

    let mut client = connect_client(port).await;
    join_chat(&mut client, "c1").await;

    send_event(
        &mut client,
        json!({ "type": "typing-started", "chatId": "c1", "userId": "u1" }),
    )
    .await;
    let _ = next_broadcast(&mut client).await;

    send_event(
        &mut client,
        json!({ "type": "typing-stopped", "chatId": "c1", "userId": "u1" }),
    )
    .await;
    let update = next_broadcast(&mut client).await;
    assert_eq!(update["typingUsers"], json!([]));

    server_handle.abort();
}

#[tokio::test]
async fn test_message_read_receipt_deduplicates() {
    let (port, state, server_handle) = start_test_server().await;
    seed_chat(&state, "c1");
    seed_message(&state, "c1", "m1", "u1");

    let mut alice = connect_client(port).await;
    let mut bob = connect_client(port).await;
    join_chat(&mut alice, "c1").await;
    join_chat(&mut bob, "c1").await;

    let event = json!({
        "type": "message-read",
        "chatId": "c1",
        "messageId": "m1",
        "userId": "u2"
    });
    send_event(&mut bob, event.clone()).await;

    let receipt = next_broadcast(&mut alice).await;
    assert_eq!(receipt["type"], "read-receipt-update");
    assert_eq!(receipt["messageId"], "m1");
    assert_eq!(receipt["readBy"], json!(["u2"]));

    // Second read by the same user changes nothing and stays silent.
    send_event(&mut bob, event).await;
    assert_no_broadcast(&mut alice).await;

    server_handle.abort();
}

#[tokio::test]
async fn test_new_message_reaches_all_members_including_sender() {
    let (port, state, server_handle) = start_test_server().await;
    seed_chat(&state, "c2");

    let mut alice = connect_client(port).await;
    let mut bob = connect_client(port).await;
    join_chat(&mut alice, "c2").await;
    join_chat(&mut bob, "c2").await;

    send_event(
        &mut alice,
        json!({
            "type": "new-message",
            "chatId": "c2",
            "message": {
                "id": "m1",
                "chatId": "c2",
                "senderId": "u1",
                "content": "Hello from u1!",
                "readBy": [],
                "createdAt": 1234567890
            }
        }),
    )
    .await;

    for client in [&mut alice, &mut bob] {
        let received = next_broadcast(client).await;
        assert_eq!(received["type"], "message-received");
        assert_eq!(received["message"]["content"], "Hello from u1!");
    }

    server_handle.abort();
}

#[tokio::test]
async fn test_events_for_unknown_chat_fail_silently() {
    let (port, _state, server_handle) = start_test_server().await;

    let mut client = connect_client(port).await;
    join_chat(&mut client, "missing").await;

    send_event(
        &mut client,
        json!({ "type": "typing-started", "chatId": "missing", "userId": "u1" }),
    )
    .await;
    assert_no_broadcast(&mut client).await;

    send_event(
        &mut client,
        json!({
            "type": "new-message",
            "chatId": "missing",
            "message": {
                "id": "m1",
                "chatId": "missing",
                "senderId": "u1",
                "content": "nobody home",
                "readBy": [],
                "createdAt": 0
            }
        }),
    )
    .await;
    assert_no_broadcast(&mut client).await;

    server_handle.abort();
}

#[tokio::test]
async fn test_broadcasts_are_scoped_to_the_room() {
    let (port, state, server_handle) = start_test_server().await;
    seed_chat(&state, "c1");
    seed_chat(&state, "c2");

    let mut alice = connect_client(port).await;
    let mut carol = connect_client(port).await;
    join_chat(&mut alice, "c1").await;
    join_chat(&mut carol, "c2").await;

    send_event(
        &mut alice,
        json!({ "type": "typing-started", "chatId": "c1", "userId": "u1" }),
    )
    .await;

    let update = next_broadcast(&mut alice).await;
    assert_eq!(update["typingUsers"], json!(["u1"]));
    assert_no_broadcast(&mut carol).await;

    server_handle.abort();
}
