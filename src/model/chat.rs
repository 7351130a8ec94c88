use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::now_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_streaming: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, attachments: Vec<String>) -> Self {
        Self {
            id: new_message_id(),
            role: Role::User,
            content: content.into(),
            timestamp: now_millis(),
            is_streaming: false,
            attachments,
        }
    }

    /// Empty assistant message that stream events fill in.
    pub fn assistant_placeholder() -> Self {
        Self {
            id: new_message_id(),
            role: Role::Assistant,
            content: String::new(),
            timestamp: now_millis(),
            is_streaming: true,
            attachments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ChatSession {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            name: name.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|message| message.id == message_id)
    }

    pub fn touch(&mut self) {
        self.updated_at = now_millis();
    }
}

pub fn new_message_id() -> String {
    format!("msg-{}", Uuid::new_v4().simple())
}
