use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub content: String,
    /// Users who have acknowledged reading this message.
    #[serde(default)]
    pub read_by: Vec<String>,
    pub created_at: i64,
}
