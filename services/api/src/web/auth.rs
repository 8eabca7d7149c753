//! services/api/src/web/auth.rs
//!
//! Registration and login endpoints.
//!
//! No session or token is issued: later requests name the acting user in
//! their body or path.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chat_assistant_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::web::{
    error::{require_fields, ApiJson, AppError, AppResult},
    state::AppState,
};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub username: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "User created successfully", body = RegisterResponse),
        (status = 400, description = "Missing field or username already taken"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> AppResult<impl IntoResponse> {
    let [username, password] =
        require_fields([("username", &req.username), ("password", &req.password)])?;

    // 1. Reject taken usernames before paying for a hash.
    match state.db.get_user(username).await {
        Ok(_) => return Err(AppError::Conflict("Username is already taken.".to_string())),
        Err(PortError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    // 2. Hash the password and store the user.
    let password_hash = state.credentials.hash_password(password).await?;
    state
        .db
        .create_user(username, &password_hash)
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => AppError::Conflict("Username is already taken.".to_string()),
            other => other.into(),
        })?;

    info!(%username, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful".to_string(),
        }),
    ))
}

/// POST /api/login - Check a username and password
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing field"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> AppResult<Json<LoginResponse>> {
    let [username, password] =
        require_fields([("username", &req.username), ("password", &req.password)])?;

    // Unknown user and wrong password produce the same error.
    let creds = match state.db.get_user_credentials(username).await {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => return Err(AppError::Auth),
        Err(e) => return Err(e.into()),
    };

    if !state
        .credentials
        .verify_password(password, &creds.password_hash)
        .await?
    {
        return Err(AppError::Auth);
    }

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        username: creds.username,
    }))
}
