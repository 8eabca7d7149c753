//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the chat endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    auth::{self, CredentialsRequest, LoginResponse, RegisterResponse},
    error::{require_fields, ApiJson, AppError, AppResult},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
};
use chat_assistant_core::{
    domain::{default_title, Chat, ChatMessage, User},
    ports::PortError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        send_message_handler,
        list_chats_handler,
        rename_chat_handler,
        delete_chat_handler,
        auth::register_handler,
        auth::login_handler,
        health_handler,
    ),
    components(
        schemas(
            SendMessageRequest, SendMessageResponse, ChatResponse, HistoryEntry, HistoryPart,
            RenameChatRequest, RenameChatResponse, DeleteChatRequest, DeleteChatResponse,
            CredentialsRequest, RegisterResponse, LoginResponse,
        )
    ),
    tags(
        (name = "Chat Assistant API", description = "Accounts and chat sessions backed by a language model.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub id_chat: Option<String>,
    pub question: Option<String>,
    pub username: Option<String>,
    /// Used only when the chat is created by this message.
    pub title: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub id_chat: String,
    pub response: String,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryPart {
    pub text: String,
}

/// One history entry, in the provider's content format.
#[derive(Serialize, ToSchema)]
pub struct HistoryEntry {
    /// `user` or `model`.
    pub role: String,
    pub parts: Vec<HistoryPart>,
}

impl From<ChatMessage> for HistoryEntry {
    fn from(message: ChatMessage) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            parts: vec![HistoryPart { text: message.text }],
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub id_chat: String,
    pub title: String,
    pub history: Vec<HistoryEntry>,
    pub timestamp: DateTime<Utc>,
}

impl From<Chat> for ChatResponse {
    fn from(chat: Chat) -> Self {
        Self {
            id_chat: chat.id_chat,
            title: chat.title,
            history: chat.history.into_iter().map(HistoryEntry::from).collect(),
            timestamp: chat.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenameChatRequest {
    pub id_chat: Option<String>,
    pub title: Option<String>,
    pub username: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenameChatResponse {
    pub message: String,
    pub id_chat: String,
    pub title: String,
}

#[derive(Deserialize, ToSchema)]
pub struct DeleteChatRequest {
    pub username: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteChatResponse {
    pub message: String,
    pub id_chat: String,
}

//=========================================================================================
// Shared Lookups
//=========================================================================================

async fn find_user(state: &AppState, username: &str) -> AppResult<User> {
    state.db.get_user(username).await.map_err(|e| match e {
        PortError::NotFound(_) => AppError::NotFound("User not found.".to_string()),
        other => other.into(),
    })
}

fn chat_not_found(e: PortError) -> AppError {
    match e {
        PortError::NotFound(_) => AppError::NotFound("Chat not found.".to_string()),
        other => other.into(),
    }
}

/// Looks up the caller and checks the chat is in their chat list.
///
/// A chat outside the list is `Forbidden` while it exists and `NotFound` once
/// it is gone, so repeating a delete reports the chat as missing.
async fn find_owner(state: &AppState, username: &str, id_chat: &str) -> AppResult<User> {
    let user = find_user(state, username).await?;
    if !user.owns_chat(id_chat) {
        return match state.db.get_chat(id_chat).await {
            Ok(_) => Err(AppError::Forbidden),
            Err(e) => Err(chat_not_found(e)),
        };
    }
    Ok(user)
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Send a message to a chat, creating the chat on its first message.
///
/// The stored history is replayed to the model together with the question.
/// The question and the reply are saved as one exchange, and the chat is
/// added to the caller's chat list if it is not there yet.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Model reply", body = SendMessageResponse),
        (status = 400, description = "Missing field"),
        (status = 404, description = "Unknown user"),
        (status = 500, description = "Provider or store failure")
    )
)]
pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> AppResult<Json<SendMessageResponse>> {
    let [id_chat, question, username] = require_fields([
        ("idChat", &req.id_chat),
        ("question", &req.question),
        ("username", &req.username),
    ])?;

    let user = find_user(&state, username).await?;

    let mut chat = match state.db.get_chat(id_chat).await {
        Ok(chat) => chat,
        Err(PortError::NotFound(_)) => {
            info!(%id_chat, %username, "Starting new chat");
            Chat::new(id_chat, default_title(question, req.title.as_deref()))
        }
        Err(e) => return Err(e.into()),
    };

    // Nothing is persisted if the provider fails.
    let reply = state
        .conversation
        .reply(&chat.history, question)
        .await
        .map_err(AppError::Upstream)?;

    chat.push_exchange(question, reply.clone());
    state.db.append_exchange(&chat).await?;

    if !user.owns_chat(id_chat) {
        state.db.link_chat(username, id_chat).await?;
    }

    Ok(Json(SendMessageResponse {
        id_chat: id_chat.to_string(),
        response: reply,
    }))
}

/// List every chat in a user's chat list.
#[utoipa::path(
    get,
    path = "/api/user/chats/{username}",
    params(
        ("username" = String, Path, description = "The user whose chats are listed.")
    ),
    responses(
        (status = 200, description = "The user's chats", body = [ChatResponse]),
        (status = 404, description = "Unknown user"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_chats_handler(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> AppResult<Json<Vec<ChatResponse>>> {
    let user = find_user(&state, &username).await?;
    let chats = state.db.get_chats_for_user(&user.username).await?;
    Ok(Json(chats.into_iter().map(ChatResponse::from).collect()))
}

/// Rename a chat owned by the caller.
#[utoipa::path(
    put,
    path = "/api/chat/title",
    request_body = RenameChatRequest,
    responses(
        (status = 200, description = "Title updated", body = RenameChatResponse),
        (status = 400, description = "Missing field"),
        (status = 403, description = "Chat not in the caller's chat list"),
        (status = 404, description = "Unknown user or chat"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn rename_chat_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RenameChatRequest>,
) -> AppResult<Json<RenameChatResponse>> {
    let [id_chat, title, username] = require_fields([
        ("idChat", &req.id_chat),
        ("title", &req.title),
        ("username", &req.username),
    ])?;

    find_owner(&state, username, id_chat).await?;
    state
        .db
        .update_chat_title(id_chat, title)
        .await
        .map_err(chat_not_found)?;

    Ok(Json(RenameChatResponse {
        message: "Title updated successfully".to_string(),
        id_chat: id_chat.to_string(),
        title: title.to_string(),
    }))
}

/// Delete a chat owned by the caller.
///
/// The chat disappears from every chat list that referenced it.
#[utoipa::path(
    delete,
    path = "/api/chat/{idChat}",
    params(
        ("idChat" = String, Path, description = "The chat to delete.")
    ),
    request_body = DeleteChatRequest,
    responses(
        (status = 200, description = "Chat deleted", body = DeleteChatResponse),
        (status = 400, description = "Missing field"),
        (status = 403, description = "Chat not in the caller's chat list"),
        (status = 404, description = "Unknown user or chat"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_chat_handler(
    State(state): State<Arc<AppState>>,
    Path(id_chat): Path<String>,
    ApiJson(req): ApiJson<DeleteChatRequest>,
) -> AppResult<Json<DeleteChatResponse>> {
    let [username] = require_fields([("username", &req.username)])?;

    find_owner(&state, username, &id_chat).await?;
    state.db.delete_chat(&id_chat).await.map_err(chat_not_found)?;

    info!(%id_chat, %username, "Chat deleted");
    Ok(Json(DeleteChatResponse {
        message: "Chat deleted successfully".to_string(),
        id_chat,
    }))
}

/// Heartbeat endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Server is healthy", body = Value)
    )
)]
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
