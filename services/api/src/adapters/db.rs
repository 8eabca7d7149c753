//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chat_assistant_core::domain::{Chat, ChatMessage, Role, User, UserCredentials};
use chat_assistant_core::ports::{DatabaseService, PortError, PortResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CredentialsRecord {
    username: String,
    password_hash: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            username: self.username,
            password_hash: self.password_hash,
        }
    }
}

/// One history entry as stored in the `chats.history` JSONB array.
#[derive(Serialize, Deserialize)]
struct MessageRecord {
    role: String,
    text: String,
}
impl MessageRecord {
    fn from_domain(message: &ChatMessage) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            text: message.text.clone(),
        }
    }

    fn to_domain(self) -> PortResult<ChatMessage> {
        let role = Role::parse(&self.role).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown role '{}' in stored history", self.role))
        })?;
        Ok(ChatMessage { role, text: self.text })
    }
}

#[derive(FromRow)]
struct ChatRecord {
    id_chat: String,
    title: String,
    history: Json<Vec<MessageRecord>>,
    created_at: DateTime<Utc>,
}
impl ChatRecord {
    fn to_domain(self) -> PortResult<Chat> {
        let history = self
            .history
            .0
            .into_iter()
            .map(MessageRecord::to_domain)
            .collect::<PortResult<Vec<_>>>()?;
        Ok(Chat {
            id_chat: self.id_chat,
            title: self.title,
            history,
            created_at: self.created_at,
        })
    }
}

fn history_records(messages: &[ChatMessage]) -> Vec<MessageRecord> {
    messages.iter().map(MessageRecord::from_domain).collect()
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, username: &str, password_hash: &str) -> PortResult<User> {
        let inserted: Option<String> = sqlx::query_scalar(
            "INSERT INTO users (username, password_hash) VALUES ($1, $2) \
             ON CONFLICT (username) DO NOTHING RETURNING username",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match inserted {
            Some(username) => Ok(User { username, chat_ids: Vec::new() }),
            None => Err(PortError::Conflict(format!("User {} already exists", username))),
        }
    }

    async fn get_user(&self, username: &str) -> PortResult<User> {
        // One statement, so the chat list matches the user row it came with.
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            "SELECT u.username, uc.id_chat FROM users u \
             LEFT JOIN user_chats uc ON uc.username = u.username \
             WHERE u.username = $1 ORDER BY uc.linked_at ASC",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let username = rows
            .first()
            .map(|(name, _)| name.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", username)))?;
        let chat_ids = rows.into_iter().filter_map(|(_, id_chat)| id_chat).collect();

        Ok(User { username, chat_ids })
    }

    async fn get_user_credentials(&self, username: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", username)),
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(record.to_domain())
    }

    async fn get_chat(&self, id_chat: &str) -> PortResult<Chat> {
        let record = sqlx::query_as::<_, ChatRecord>(
            "SELECT id_chat, title, history, created_at FROM chats WHERE id_chat = $1",
        )
        .bind(id_chat)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Chat {} not found", id_chat)),
            _ => PortError::Unexpected(e.to_string()),
        })?;
        record.to_domain()
    }

    async fn append_exchange(&self, chat: &Chat) -> PortResult<()> {
        let exchange = chat
            .last_exchange()
            .ok_or_else(|| PortError::Unexpected(format!("Chat {} has no exchange to save", chat.id_chat)))?;

        // A single upsert: concurrent writers to the same chat each append their
        // own pair instead of overwriting each other's history.
        sqlx::query(
            "INSERT INTO chats (id_chat, title, history, created_at) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id_chat) DO UPDATE SET history = chats.history || $5::jsonb",
        )
        .bind(&chat.id_chat)
        .bind(&chat.title)
        .bind(Json(history_records(&chat.history)))
        .bind(chat.created_at)
        .bind(Json(history_records(exchange)))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_chats_for_user(&self, username: &str) -> PortResult<Vec<Chat>> {
        let records = sqlx::query_as::<_, ChatRecord>(
            "SELECT c.id_chat, c.title, c.history, c.created_at FROM chats c \
             JOIN user_chats uc ON uc.id_chat = c.id_chat \
             WHERE uc.username = $1 ORDER BY uc.linked_at ASC",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(ChatRecord::to_domain).collect()
    }

    async fn update_chat_title(&self, id_chat: &str, title: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE chats SET title = $1 WHERE id_chat = $2")
            .bind(title)
            .bind(id_chat)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Chat {} not found", id_chat)));
        }
        Ok(())
    }

    async fn delete_chat(&self, id_chat: &str) -> PortResult<()> {
        // user_chats rows go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM chats WHERE id_chat = $1")
            .bind(id_chat)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Chat {} not found", id_chat)));
        }
        Ok(())
    }

    async fn link_chat(&self, username: &str, id_chat: &str) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO user_chats (username, id_chat) VALUES ($1, $2) \
             ON CONFLICT (username, id_chat) DO NOTHING",
        )
        .bind(username)
        .bind(id_chat)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}

// These run against a live Postgres: `DATABASE_URL=postgres://... cargo test -- --ignored`.
// `sqlx::test` creates a fresh database per test and applies ./migrations.
#[cfg(test)]
mod tests {
    use super::*;

    fn chat_with_exchange(id: &str, q: &str, a: &str) -> Chat {
        let mut chat = Chat::new(id, "title");
        chat.push_exchange(q, a);
        chat
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn duplicate_username_is_a_conflict(pool: PgPool) {
        let db = DbAdapter::new(pool);
        db.create_user("alice", "h").await.unwrap();
        let err = db.create_user("alice", "h2").await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
        assert_eq!(db.get_user_credentials("alice").await.unwrap().password_hash, "h");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn upsert_appends_and_keeps_stored_title(pool: PgPool) {
        let db = DbAdapter::new(pool);
        db.append_exchange(&chat_with_exchange("c1", "q1", "a1")).await.unwrap();

        let mut stale = Chat::new("c1", "other title");
        stale.push_exchange("q2", "a2");
        db.append_exchange(&stale).await.unwrap();

        let chat = db.get_chat("c1").await.unwrap();
        assert_eq!(chat.title, "title");
        let texts: Vec<_> = chat.history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["q1", "a1", "q2", "a2"]);
        assert_eq!(chat.history[1].role, Role::Model);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn get_user_lists_links_in_order(pool: PgPool) {
        let db = DbAdapter::new(pool);
        db.create_user("alice", "h").await.unwrap();
        assert!(db.get_user("alice").await.unwrap().chat_ids.is_empty());

        for id in ["c2", "c1"] {
            db.append_exchange(&chat_with_exchange(id, "q", "a")).await.unwrap();
            db.link_chat("alice", id).await.unwrap();
        }
        db.link_chat("alice", "c2").await.unwrap();

        assert_eq!(db.get_user("alice").await.unwrap().chat_ids, ["c2", "c1"]);
        assert!(matches!(db.get_user("ghost").await, Err(PortError::NotFound(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn delete_cascades_to_every_link(pool: PgPool) {
        let db = DbAdapter::new(pool);
        db.create_user("alice", "h").await.unwrap();
        db.create_user("bob", "h").await.unwrap();
        db.append_exchange(&chat_with_exchange("c1", "q", "a")).await.unwrap();
        db.link_chat("alice", "c1").await.unwrap();
        db.link_chat("bob", "c1").await.unwrap();

        db.delete_chat("c1").await.unwrap();

        assert!(db.get_user("alice").await.unwrap().chat_ids.is_empty());
        assert!(db.get_chats_for_user("bob").await.unwrap().is_empty());
        assert!(matches!(db.delete_chat("c1").await, Err(PortError::NotFound(_))));
        assert!(matches!(
            db.update_chat_title("c1", "t").await,
            Err(PortError::NotFound(_))
        ));
    }
}
