use serde::{Deserialize, Serialize};

use super::message::Message;

/// Conversation entity. Owns its messages, participants and typing state.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub participants: Vec<String>,
    pub typing_users: Vec<String>,
    pub messages: Vec<Message>,
    pub created_at: i64,
    pub updated_at: i64,
}
