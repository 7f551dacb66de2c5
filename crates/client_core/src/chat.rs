//! Chat transcript behind the chat panel. Replies are echoed locally until
//! the MCP service exposes a conversation endpoint.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,
}

#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the user's message and the reply, returning the reply.
    pub fn send(&mut self, text: &str) -> Result<&ChatMessage, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        self.messages.push(ChatMessage {
            role: ChatRole::User,
            text: text.to_string(),
            sent_at: Utc::now(),
        });
        self.messages.push(ChatMessage {
            role: ChatRole::Assistant,
            text: reply_to(text),
            sent_at: Utc::now(),
        });

        Ok(&self.messages[self.messages.len() - 1])
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

fn reply_to(text: &str) -> String {
    format!("AI reply: {text}")
}
