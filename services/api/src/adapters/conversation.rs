//! services/api/src/adapters/conversation.rs
//!
//! This module contains the adapter for the chat model. It implements the
//! `ConversationService` port from the `core` crate on top of any
//! OpenAI-compatible chat completions endpoint, which covers both OpenAI and
//! Google Gemini.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    },
    Client,
};
use async_trait::async_trait;
use chat_assistant_core::domain::{ChatMessage, Role};
use chat_assistant_core::ports::{ConversationService, PortError, PortResult};
use tracing::{debug, error};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Sends the stored history plus the new question to a chat completions API.
///
/// Does not derive `Debug`: the client holds the API key.
pub struct OpenAiConversationAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiConversationAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    /// Connects to OpenAI.
    pub fn openai(api_key: &str, model: &str) -> Self {
        Self::with_base(OPENAI_API_BASE, api_key, model)
    }

    /// Connects to Gemini through its OpenAI-compatible endpoint.
    pub fn gemini(api_key: &str, model: &str) -> Self {
        Self::with_base(GEMINI_API_BASE, api_key, model)
    }

    fn with_base(api_base: &str, api_key: &str, model: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        Self::new(Client::with_config(config), model.to_string())
    }

    fn build_request(&self, history: &[ChatMessage], message: &str) -> CreateChatCompletionRequest {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            history.iter().map(to_request_message).collect();
        messages.push(user_message(message.to_string()));

        CreateChatCompletionRequest {
            model: self.model.clone(),
            messages,
            ..Default::default()
        }
    }
}

fn user_message(text: String) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
        content: ChatCompletionRequestUserMessageContent::Text(text),
        name: None,
    })
}

fn to_request_message(message: &ChatMessage) -> ChatCompletionRequestMessage {
    match message.role {
        Role::User => user_message(message.text.clone()),
        Role::Model => {
            #[allow(deprecated)]
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                    message.text.clone(),
                )),
                refusal: None,
                name: None,
                audio: None,
                tool_calls: None,
                function_call: None,
            })
        }
    }
}

fn map_openai_error(err: OpenAIError) -> PortError {
    match &err {
        OpenAIError::ApiError(api_err) => {
            PortError::Unexpected(format!("Provider rejected the request: {}", api_err.message))
        }
        _ => PortError::Unexpected(err.to_string()),
    }
}

#[async_trait]
impl ConversationService for OpenAiConversationAdapter {
    async fn reply(&self, history: &[ChatMessage], message: &str) -> PortResult<String> {
        let request = self.build_request(history, message);
        debug!(model = %self.model, history_len = history.len(), "Sending chat completion request");

        let response = self.client.chat().create(request).await.map_err(|e| {
            error!("Chat completion request failed: {:?}", e);
            map_openai_error(e)
        })?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| PortError::Unexpected("No reply generated".to_string()))
    }
}
