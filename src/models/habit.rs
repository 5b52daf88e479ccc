use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    /// One of daily, weekly, monthly.
    pub frequency: String,
    /// Wall-clock reminder slot, e.g. "07:30".
    pub reminder_time: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}
