//! crates/chat_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use crate::domain::{Chat, ChatMessage, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Item already exists: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---

    /// Fails with `PortError::Conflict` when the username is taken.
    async fn create_user(&self, username: &str, password_hash: &str) -> PortResult<User>;

    async fn get_user(&self, username: &str) -> PortResult<User>;

    async fn get_user_credentials(&self, username: &str) -> PortResult<UserCredentials>;

    // --- Chat Management ---

    async fn get_chat(&self, id_chat: &str) -> PortResult<Chat>;

    /// Persists the latest exchange of `chat`.
    ///
    /// Inserts the whole chat when `id_chat` is unknown. Otherwise only the last
    /// two history entries are appended to the stored history; the stored title
    /// and creation time are left alone.
    async fn append_exchange(&self, chat: &Chat) -> PortResult<()>;

    async fn get_chats_for_user(&self, username: &str) -> PortResult<Vec<Chat>>;

    async fn update_chat_title(&self, id_chat: &str, title: &str) -> PortResult<()>;

    /// Removes the chat and every user's link to it.
    async fn delete_chat(&self, id_chat: &str) -> PortResult<()>;

    // --- Ownership ---

    /// Associates a chat with a user. Linking twice is a no-op.
    async fn link_chat(&self, username: &str, id_chat: &str) -> PortResult<()>;
}

#[async_trait]
pub trait CredentialService: Send + Sync {
    /// Produces a salted hash suitable for storage.
    async fn hash_password(&self, password: &str) -> PortResult<String>;
    async fn verify_password(&self, password: &str, password_hash: &str) -> PortResult<bool>;
}

#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Continues a conversation seeded with `history` and returns the model's reply to `message`.
    async fn reply(&self, history: &[ChatMessage], message: &str) -> PortResult<String>;
}
