use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One chat line. The assistant variant is what `chat` hands back to the
/// transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub user_id: String,
    pub session_id: String,
    pub content: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(user_id: &str, session_id: &str, role: Role, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            content: content.to_string(),
            role,
            created_at: Utc::now(),
        }
    }
}
