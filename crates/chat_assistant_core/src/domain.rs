//! crates/chat_assistant_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or HTTP representation.

use chrono::{DateTime, Utc};

/// Number of characters of the first question used for a default chat title.
pub const DEFAULT_TITLE_CHARS: usize = 50;

/// Who authored a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }

    /// Parses the lowercase wire name produced by [`Role::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "model" => Some(Role::Model),
            _ => None,
        }
    }
}

/// A single role-tagged entry in a chat history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, text: text.into() }
    }
}

/// A chat session identified by a client-supplied id.
#[derive(Debug, Clone, PartialEq)]
pub struct Chat {
    pub id_chat: String,
    pub title: String,
    pub history: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    /// Creates a chat with an empty history, not yet persisted.
    pub fn new(id_chat: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id_chat: id_chat.into(),
            title: title.into(),
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Appends one question/reply exchange. Both entries are pushed together so
    /// the history length stays even.
    pub fn push_exchange(&mut self, question: impl Into<String>, reply: impl Into<String>) {
        self.history.push(ChatMessage::user(question));
        self.history.push(ChatMessage::model(reply));
    }

    /// The most recent exchange, if any.
    pub fn last_exchange(&self) -> Option<&[ChatMessage]> {
        let len = self.history.len();
        (len >= 2).then(|| &self.history[len - 2..])
    }
}

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub chat_ids: Vec<String>,
}

impl User {
    pub fn owns_chat(&self, id_chat: &str) -> bool {
        self.chat_ids.iter().any(|id| id == id_chat)
    }
}

// Only used internally for login/register - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub username: String,
    pub password_hash: String,
}

/// Picks the title for a newly created chat.
///
/// A non-empty `title` wins. Otherwise the first [`DEFAULT_TITLE_CHARS`]
/// characters of the question are used, always followed by `...`.
pub fn default_title(question: &str, title: Option<&str>) -> String {
    match title {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => {
            let prefix: String = question.chars().take(DEFAULT_TITLE_CHARS).collect();
            format!("{}...", prefix)
        }
    }
}
