use serde::{Deserialize, Serialize};

/// Accountability pairing between two users.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Partnership {
    pub id: String,
    pub user_id: String,
    pub partner_id: String,
    /// One of pending, accepted.
    pub status: String,
    pub created_at: i64,
}
