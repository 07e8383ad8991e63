use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One moderated chat room managed by the service. The platform chat id is
/// whatever the transport layer uses to address the room; the core never
/// interprets it.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Room {
    pub room_id: Uuid,
    pub platform_chat_id: String,
    pub title: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn new(platform_chat_id: &str, title: &str) -> Self {
        let now = Utc::now();
        Self {
            room_id: Uuid::new_v4(),
            platform_chat_id: platform_chat_id.to_string(),
            title: title.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
