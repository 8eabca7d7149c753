pub mod auth;
pub mod error;
pub mod rest;
pub mod state;

pub use auth::{login_handler, register_handler};
pub use rest::{
    delete_chat_handler, health_handler, list_chats_handler, rename_chat_handler,
    send_message_handler,
};

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use state::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Builds the application routes. CORS and the Swagger UI are added by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/chat", post(send_message_handler))
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/user/chats/{username}", get(list_chats_handler))
        .route("/chat/title", put(rename_chat_handler))
        .route("/chat/{idChat}", delete(delete_chat_handler));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
