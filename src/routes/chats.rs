//! Chat and message routes. This group is the only writer of chat and
//! message records; the socket relay broadcasts against state persisted
//! here.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::input::{CreateChatInput, SendMessageInput, ValidateExt};
use crate::models::{Chat, Message};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_chats).post(create_chat))
        .route("/{id}", get(get_chat))
        .route("/{id}/messages", axum::routing::post(send_message))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListChatsQuery {
    user_id: Option<String>,
}

/// Assemble a chat with participants, typing set, and messages
/// (each carrying its reader set).
pub fn load_chat(conn: &Connection, chat_id: &str) -> ApiResult<Option<Chat>> {
    let header: Option<(i64, i64)> = conn
        .query_row(
            "SELECT created_at, updated_at FROM chats WHERE id = ?1",
            [chat_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((created_at, updated_at)) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT user_id FROM chat_participants WHERE chat_id = ?1 ORDER BY joined_at, user_id",
    )?;
    let participants = stmt
        .query_map([chat_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    let typing_users = db::typing_users(conn, chat_id)?;

    let mut stmt = conn.prepare(
        "SELECT id, chat_id, sender_id, content, created_at FROM messages
         WHERE chat_id = ?1 ORDER BY created_at",
    )?;
    let mut messages = stmt
        .query_map([chat_id], |row| {
            Ok(Message {
                id: row.get(0)?,
                chat_id: row.get(1)?,
                sender_id: row.get(2)?,
                content: row.get(3)?,
                read_by: vec![],
                created_at: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<Message>>>()?;

    for message in &mut messages {
        message.read_by = db::message_readers(conn, &message.id)?;
    }

    Ok(Some(Chat {
        id: chat_id.to_string(),
        participants,
        typing_users,
        messages,
        created_at,
        updated_at,
    }))
}

async fn create_chat(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateChatInput>,
) -> ApiResult<Json<Chat>> {
    input.validate_input()?;

    let conn = state.db.0.lock()?;
    let now = chrono::Utc::now().timestamp_millis();
    let chat_id = uuid::Uuid::new_v4().to_string();

    conn.execute(
        "INSERT INTO chats (id, created_at, updated_at) VALUES (?1, ?2, ?3)",
        (&chat_id, now, now),
    )?;
    for participant in &input.participants {
        conn.execute(
            "INSERT OR IGNORE INTO chat_participants (chat_id, user_id, joined_at)
             VALUES (?1, ?2, ?3)",
            (&chat_id, participant, now),
        )?;
    }

    let chat = load_chat(&conn, &chat_id)?.ok_or(ApiError::NotFound("chat"))?;
    Ok(Json(chat))
}

async fn list_chats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListChatsQuery>,
) -> ApiResult<Json<Vec<Chat>>> {
    let conn = state.db.0.lock()?;

    let chat_ids = match &query.user_id {
        Some(user_id) => {
            let mut stmt = conn.prepare(
                "SELECT c.id FROM chats c
                 JOIN chat_participants cp ON c.id = cp.chat_id
                 WHERE cp.user_id = ?1
                 ORDER BY c.updated_at DESC",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            ids
        }
        None => {
            let mut stmt = conn.prepare("SELECT id FROM chats ORDER BY updated_at DESC")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            ids
        }
    };

    let mut chats = Vec::new();
    for chat_id in chat_ids {
        if let Some(chat) = load_chat(&conn, &chat_id)? {
            chats.push(chat);
        }
    }
    Ok(Json(chats))
}

async fn get_chat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Chat>> {
    let conn = state.db.0.lock()?;
    let chat = load_chat(&conn, &id)?.ok_or(ApiError::NotFound("chat"))?;
    Ok(Json(chat))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<SendMessageInput>,
) -> ApiResult<Json<Message>> {
    input.validate_input()?;

    let conn = state.db.0.lock()?;
    if !db::chat_exists(&conn, &id)? {
        return Err(ApiError::NotFound("chat"));
    }

    let now = chrono::Utc::now().timestamp_millis();
    let message_id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO messages (id, chat_id, sender_id, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (&message_id, &id, &input.sender_id, &input.content, now),
    )?;
    conn.execute(
        "UPDATE chats SET updated_at = ?1 WHERE id = ?2",
        (now, &id),
    )?;

    Ok(Json(Message {
        id: message_id,
        chat_id: id,
        sender_id: input.sender_id,
        content: input.content,
        read_by: vec![],
        created_at: now,
    }))
}
