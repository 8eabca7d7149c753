//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use chat_assistant_core::ports::{ConversationService, CredentialService, DatabaseService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub credentials: Arc<dyn CredentialService>,
    pub conversation: Arc<dyn ConversationService>,
}
