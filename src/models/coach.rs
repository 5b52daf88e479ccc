use serde::{Deserialize, Serialize};

/// A stored coaching recommendation for a user, optionally tied to a habit.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CoachNote {
    pub id: String,
    pub user_id: String,
    pub habit_id: Option<String>,
    pub body: String,
    pub created_at: i64,
}
