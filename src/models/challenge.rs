use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_by: String,
    pub starts_at: i64,
    pub ends_at: i64,
    pub created_at: i64,
}
