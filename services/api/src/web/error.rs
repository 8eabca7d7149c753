//! services/api/src/web/error.rs
//!
//! The error taxonomy returned by every handler, and its mapping to HTTP
//! status codes and the `{ "error": "..." }` response body.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chat_assistant_core::ports::PortError;
use serde_json::json;
use tracing::{debug, error};

pub const INVALID_CREDENTIALS: &str = "Invalid username or password.";
pub const ACCESS_DENIED: &str = "Access denied.";
pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";
pub const INVALID_JSON_BODY: &str = "Invalid JSON body.";

/// Every way a request can fail.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A required field is missing or the body is malformed.
    #[error("{0}")]
    Validation(String),
    /// The resource already exists.
    #[error("{0}")]
    Conflict(String),
    /// Bad credentials. The message never says which part was wrong.
    #[error("{}", INVALID_CREDENTIALS)]
    Auth,
    #[error("{0}")]
    NotFound(String),
    /// The chat is not in the caller's chat list.
    #[error("{}", ACCESS_DENIED)]
    Forbidden,
    /// The conversation provider failed.
    #[error("Upstream provider error: {0}")]
    Upstream(PortError),
    /// Store or other unexpected failure.
    #[error("Internal error: {0}")]
    Internal(PortError),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<PortError> for AppError {
    fn from(e: PortError) -> Self {
        AppError::Internal(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected request body: {}", rejection.body_text());
        AppError::Validation(INVALID_JSON_BODY.to_string())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Auth => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Upstream(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Upstream(_) | AppError::Internal(_) => {
                error!("Request failed: {}", self);
                INTERNAL_SERVER_ERROR.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// `Json` extractor whose rejections use the same error body as the handlers.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Returns the field's value, or a validation error naming every missing field.
///
/// Empty strings count as missing.
pub fn require_fields<'a, const N: usize>(
    fields: [(&'static str, &'a Option<String>); N],
) -> AppResult<[&'a str; N]> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Validation(format!("{} required.", missing.join(", "))));
    }
    Ok(fields.map(|(_, value)| value.as_deref().unwrap_or_default()))
}
