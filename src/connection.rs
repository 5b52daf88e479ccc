//! WebSocket side of the chat relay.
//!
//! Each connection gets an outbound channel registered per-room in
//! [`RelayState`]; incoming events mutate the chat tables and then
//! re-broadcast derived state to the room. Failures never cross the
//! socket boundary back to the client; they resolve to a
//! [`RelayOutcome`] that is only logged.

use std::sync::Arc;

use axum::extract::ws::{Message as WsFrame, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db;
use crate::events::WsEvent;
use crate::models::Message;
use crate::state::{ConnectionId, ConnectionSender};
use crate::AppState;

/// Outcome of one relay event against the persistence layer.
#[derive(Debug)]
pub enum RelayOutcome {
    Applied,
    /// The mutation was already in place; nothing was broadcast.
    AlreadyApplied,
    NotFound(&'static str),
    PersistFailed(String),
}

/// GET /ws, upgrades to the chat socket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// Drive a single WebSocket connection until it closes.
pub async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = Uuid::new_v4();
    info!("Client connected: {}", conn_id);

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Channel for pushing broadcasts to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // Forward queued broadcasts onto the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(WsFrame::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            res = ws_receiver.next() => {
                match res {
                    Some(Ok(WsFrame::Text(text))) => {
                        handle_event(&text, conn_id, &tx, &state);
                    }
                    Some(Ok(WsFrame::Close(_))) => {
                        info!("Client {} sent close frame", conn_id);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error for {}: {}", conn_id, e);
                        break;
                    }
                    None => {
                        info!("WebSocket stream ended for {}", conn_id);
                        break;
                    }
                }
            }
            _ = &mut send_task => {
                info!("Send task finished for {} (likely connection lost)", conn_id);
                break;
            }
        }
    }

    send_task.abort();
    state.relay.leave_all(conn_id);
    info!("Client disconnected: {}", conn_id);
}

/// Parse and dispatch one incoming event.
pub fn handle_event(text: &str, conn_id: ConnectionId, tx: &ConnectionSender, state: &AppState) {
    let event: WsEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            warn!("Failed to parse event from {}: {}", conn_id, e);
            return;
        }
    };
    let name = event.name();

    let outcome = match event {
        WsEvent::JoinChat { chat_id } => {
            state.relay.join(&chat_id, conn_id, tx.clone());
            debug!("Connection {} joined chat: {}", conn_id, chat_id);
            RelayOutcome::Applied
        }
        WsEvent::TypingStarted { chat_id, user_id } => typing_started(state, &chat_id, &user_id),
        WsEvent::TypingStopped { chat_id, user_id } => typing_stopped(state, &chat_id, &user_id),
        WsEvent::MessageRead {
            chat_id,
            message_id,
            user_id,
        } => message_read(state, &chat_id, &message_id, &user_id),
        WsEvent::NewMessage { chat_id, message } => new_message(state, &chat_id, message),
        // Server-emitted events are not accepted from clients.
        WsEvent::TypingUpdate { .. }
        | WsEvent::ReadReceiptUpdate { .. }
        | WsEvent::MessageReceived { .. } => {
            warn!("Ignoring server-only event {} from {}", name, conn_id);
            return;
        }
    };

    match &outcome {
        RelayOutcome::Applied => debug!("{} applied for {}", name, conn_id),
        RelayOutcome::AlreadyApplied => debug!("{} already applied, nothing to do", name),
        RelayOutcome::NotFound(what) => warn!("Error in {}: {} not found", name, what),
        RelayOutcome::PersistFailed(e) => error!("Error in {}: {}", name, e),
    }
}

fn typing_started(state: &AppState, chat_id: &str, user_id: &str) -> RelayOutcome {
    let typing_users = {
        let conn = match state.db.0.lock() {
            Ok(conn) => conn,
            Err(e) => return RelayOutcome::PersistFailed(e.to_string()),
        };
        match db::chat_exists(&conn, chat_id) {
            Ok(true) => {}
            Ok(false) => return RelayOutcome::NotFound("chat"),
            Err(e) => return RelayOutcome::PersistFailed(e.to_string()),
        }
        match db::add_typing_user(&conn, chat_id, user_id) {
            Ok(true) => {}
            Ok(false) => return RelayOutcome::AlreadyApplied,
            Err(e) => return RelayOutcome::PersistFailed(e.to_string()),
        }
        match db::typing_users(&conn, chat_id) {
            Ok(users) => users,
            Err(e) => return RelayOutcome::PersistFailed(e.to_string()),
        }
    };

    broadcast(
        state,
        chat_id,
        &WsEvent::TypingUpdate {
            chat_id: chat_id.to_string(),
            typing_users,
        },
    );
    RelayOutcome::Applied
}

fn typing_stopped(state: &AppState, chat_id: &str, user_id: &str) -> RelayOutcome {
    let typing_users = {
        let conn = match state.db.0.lock() {
            Ok(conn) => conn,
            Err(e) => return RelayOutcome::PersistFailed(e.to_string()),
        };
        match db::chat_exists(&conn, chat_id) {
            Ok(true) => {}
            Ok(false) => return RelayOutcome::NotFound("chat"),
            Err(e) => return RelayOutcome::PersistFailed(e.to_string()),
        }
        // Removing an absent user is a no-op; the update is broadcast
        // either way so clients converge on the stored set.
        if let Err(e) = db::remove_typing_user(&conn, chat_id, user_id) {
            return RelayOutcome::PersistFailed(e.to_string());
        }
        match db::typing_users(&conn, chat_id) {
            Ok(users) => users,
            Err(e) => return RelayOutcome::PersistFailed(e.to_string()),
        }
    };

    broadcast(
        state,
        chat_id,
        &WsEvent::TypingUpdate {
            chat_id: chat_id.to_string(),
            typing_users,
        },
    );
    RelayOutcome::Applied
}

fn message_read(state: &AppState, chat_id: &str, message_id: &str, user_id: &str) -> RelayOutcome {
    let read_by = {
        let conn = match state.db.0.lock() {
            Ok(conn) => conn,
            Err(e) => return RelayOutcome::PersistFailed(e.to_string()),
        };
        match db::chat_exists(&conn, chat_id) {
            Ok(true) => {}
            Ok(false) => return RelayOutcome::NotFound("chat"),
            Err(e) => return RelayOutcome::PersistFailed(e.to_string()),
        }
        match db::message_in_chat(&conn, chat_id, message_id) {
            Ok(true) => {}
            Ok(false) => return RelayOutcome::NotFound("message"),
            Err(e) => return RelayOutcome::PersistFailed(e.to_string()),
        }
        match db::add_message_reader(&conn, message_id, user_id) {
            Ok(true) => {}
            Ok(false) => return RelayOutcome::AlreadyApplied,
            Err(e) => return RelayOutcome::PersistFailed(e.to_string()),
        }
        match db::message_readers(&conn, message_id) {
            Ok(readers) => readers,
            Err(e) => return RelayOutcome::PersistFailed(e.to_string()),
        }
    };

    broadcast(
        state,
        chat_id,
        &WsEvent::ReadReceiptUpdate {
            message_id: message_id.to_string(),
            read_by,
        },
    );
    RelayOutcome::Applied
}

/// Existence check only; the message was persisted through the HTTP
/// path and is re-broadcast verbatim.
fn new_message(state: &AppState, chat_id: &str, message: Message) -> RelayOutcome {
    {
        let conn = match state.db.0.lock() {
            Ok(conn) => conn,
            Err(e) => return RelayOutcome::PersistFailed(e.to_string()),
        };
        match db::chat_exists(&conn, chat_id) {
            Ok(true) => {}
            Ok(false) => return RelayOutcome::NotFound("chat"),
            Err(e) => return RelayOutcome::PersistFailed(e.to_string()),
        }
    }

    broadcast(state, chat_id, &WsEvent::MessageReceived { message });
    RelayOutcome::Applied
}

fn broadcast(state: &AppState, chat_id: &str, event: &WsEvent) {
    match serde_json::to_string(event) {
        Ok(json) => state.relay.broadcast(chat_id, &json),
        Err(e) => error!("Failed to serialize {} for chat {}: {}", event.name(), chat_id, e),
    }
}
