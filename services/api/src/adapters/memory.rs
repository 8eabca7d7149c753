//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. It mirrors the
//! Postgres adapter's semantics (unique usernames, ownership links removed with
//! their chat) and is selected with `DATABASE_URL=memory://`.

use async_trait::async_trait;
use chat_assistant_core::domain::{Chat, User, UserCredentials};
use chat_assistant_core::ports::{DatabaseService, PortError, PortResult};
use std::collections::HashMap;
use tokio::sync::RwLock;

pub const MEMORY_DATABASE_URL: &str = "memory://";

struct StoredUser {
    password_hash: String,
    chat_ids: Vec<String>,
}

#[derive(Default)]
struct Collections {
    users: HashMap<String, StoredUser>,
    chats: HashMap<String, Chat>,
}

/// A `DatabaseService` that keeps everything in memory for the life of the process.
#[derive(Default)]
pub struct InMemoryDb {
    inner: RwLock<Collections>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

fn user_not_found(username: &str) -> PortError {
    PortError::NotFound(format!("User {} not found", username))
}

fn chat_not_found(id_chat: &str) -> PortError {
    PortError::NotFound(format!("Chat {} not found", id_chat))
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_user(&self, username: &str, password_hash: &str) -> PortResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.contains_key(username) {
            return Err(PortError::Conflict(format!("User {} already exists", username)));
        }
        inner.users.insert(
            username.to_string(),
            StoredUser {
                password_hash: password_hash.to_string(),
                chat_ids: Vec::new(),
            },
        );
        Ok(User {
            username: username.to_string(),
            chat_ids: Vec::new(),
        })
    }

    async fn get_user(&self, username: &str) -> PortResult<User> {
        let inner = self.inner.read().await;
        let stored = inner.users.get(username).ok_or_else(|| user_not_found(username))?;
        Ok(User {
            username: username.to_string(),
            chat_ids: stored.chat_ids.clone(),
        })
    }

    async fn get_user_credentials(&self, username: &str) -> PortResult<UserCredentials> {
        let inner = self.inner.read().await;
        let stored = inner.users.get(username).ok_or_else(|| user_not_found(username))?;
        Ok(UserCredentials {
            username: username.to_string(),
            password_hash: stored.password_hash.clone(),
        })
    }

    async fn get_chat(&self, id_chat: &str) -> PortResult<Chat> {
        let inner = self.inner.read().await;
        inner
            .chats
            .get(id_chat)
            .cloned()
            .ok_or_else(|| chat_not_found(id_chat))
    }

    async fn append_exchange(&self, chat: &Chat) -> PortResult<()> {
        let exchange = chat.last_exchange().ok_or_else(|| {
            PortError::Unexpected(format!("Chat {} has no exchange to save", chat.id_chat))
        })?;

        let mut inner = self.inner.write().await;
        inner
            .chats
            .entry(chat.id_chat.clone())
            .and_modify(|stored| stored.history.extend_from_slice(exchange))
            .or_insert_with(|| chat.clone());
        Ok(())
    }

    async fn get_chats_for_user(&self, username: &str) -> PortResult<Vec<Chat>> {
        let inner = self.inner.read().await;
        let stored = inner.users.get(username).ok_or_else(|| user_not_found(username))?;
        Ok(stored
            .chat_ids
            .iter()
            .filter_map(|id| inner.chats.get(id).cloned())
            .collect())
    }

    async fn update_chat_title(&self, id_chat: &str, title: &str) -> PortResult<()> {
        let mut inner = self.inner.write().await;
        let chat = inner
            .chats
            .get_mut(id_chat)
            .ok_or_else(|| chat_not_found(id_chat))?;
        chat.title = title.to_string();
        Ok(())
    }

    async fn delete_chat(&self, id_chat: &str) -> PortResult<()> {
        let mut inner = self.inner.write().await;
        if inner.chats.remove(id_chat).is_none() {
            return Err(chat_not_found(id_chat));
        }
        for user in inner.users.values_mut() {
            user.chat_ids.retain(|id| id != id_chat);
        }
        Ok(())
    }

    async fn link_chat(&self, username: &str, id_chat: &str) -> PortResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.chats.contains_key(id_chat) {
            return Err(chat_not_found(id_chat));
        }
        let user = inner
            .users
            .get_mut(username)
            .ok_or_else(|| user_not_found(username))?;
        if !user.chat_ids.iter().any(|id| id == id_chat) {
            user.chat_ids.push(id_chat.to_string());
        }
        Ok(())
    }
}
