//! Chat rooms and their message log.

use serde::{Deserialize, Serialize};

/// Author name used for chatbot replies.
pub const BOT_AUTHOR: &str = "chatbot";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub room_id: i64,
    pub author: String,
    pub content: String,
    pub created_at: i64,
}

impl ChatMessage {
    #[must_use]
    pub fn is_from_bot(&self) -> bool {
        self.author == BOT_AUTHOR
    }
}
