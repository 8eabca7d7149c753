//! Shared harness for the HTTP tests: the real router over the in-memory
//! store, with test doubles for the credential and conversation ports.

#![allow(dead_code)]

use api_lib::adapters::{Argon2Credentials, InMemoryDb};
use api_lib::web::{self, state::AppState};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use chat_assistant_core::domain::ChatMessage;
use chat_assistant_core::ports::{
    ConversationService, CredentialService, PortError, PortResult,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Replies `echo: <message>` and records the history length it was given.
#[derive(Default)]
pub struct ScriptedConversation {
    calls: Mutex<Vec<(usize, String)>>,
    failing: AtomicBool,
}

impl ScriptedConversation {
    pub fn fail_next_calls(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// `(history length, message)` for every successful call, in order.
    pub fn calls(&self) -> Vec<(usize, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversationService for ScriptedConversation {
    async fn reply(&self, history: &[ChatMessage], message: &str) -> PortResult<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("provider unavailable".to_string()));
        }
        self.calls
            .lock()
            .unwrap()
            .push((history.len(), message.to_string()));
        Ok(format!("echo: {}", message))
    }
}

/// Cheap reversible "hash" so tests that are not about passwords stay fast.
pub struct PlainCredentials;

#[async_trait]
impl CredentialService for PlainCredentials {
    async fn hash_password(&self, password: &str) -> PortResult<String> {
        Ok(format!("plain${}", password))
    }

    async fn verify_password(&self, password: &str, password_hash: &str) -> PortResult<bool> {
        Ok(password_hash == format!("plain${}", password))
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDb>,
    pub conversation: Arc<ScriptedConversation>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_credentials(Arc::new(PlainCredentials))
    }

    pub fn with_argon2() -> Self {
        Self::with_credentials(Arc::new(Argon2Credentials::new()))
    }

    fn with_credentials(credentials: Arc<dyn CredentialService>) -> Self {
        let db = Arc::new(InMemoryDb::new());
        let conversation = Arc::new(ScriptedConversation::default());
        let state = Arc::new(AppState {
            db: db.clone(),
            credentials,
            conversation: conversation.clone(),
        });
        Self {
            router: web::router(state),
            db,
            conversation,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn register(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            "/api/register",
            Some(serde_json::json!({ "username": username, "password": password })),
        )
        .await
    }

    pub async fn chat(&self, id_chat: &str, question: &str, username: &str) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            "/api/chat",
            Some(serde_json::json!({ "idChat": id_chat, "question": question, "username": username })),
        )
        .await
    }

    pub async fn list(&self, username: &str) -> (StatusCode, Value) {
        self.request(Method::GET, &format!("/api/user/chats/{}", username), None)
            .await
    }

    pub async fn rename(&self, id_chat: &str, title: &str, username: &str) -> (StatusCode, Value) {
        self.request(
            Method::PUT,
            "/api/chat/title",
            Some(serde_json::json!({ "idChat": id_chat, "title": title, "username": username })),
        )
        .await
    }

    pub async fn delete(&self, id_chat: &str, username: &str) -> (StatusCode, Value) {
        self.request(
            Method::DELETE,
            &format!("/api/chat/{}", id_chat),
            Some(serde_json::json!({ "username": username })),
        )
        .await
    }
}
