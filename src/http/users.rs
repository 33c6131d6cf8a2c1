//! User account and session handlers.

use super::{ApiError, AppState, AuthUser};
use crate::auth::SessionIssuer;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct UpdateUsernameRequest {
    pub username: String,
}

#[derive(Deserialize)]
pub struct UpdatePasswordRequest {
    pub password: String,
}

fn validate_new_user(req: &CreateUserRequest) -> Result<(), ApiError> {
    if req.username.trim().is_empty() {
        return Err(ApiError::bad_request("username is required"));
    }
    if !req.email.contains('@') {
        return Err(ApiError::bad_request("invalid email address"));
    }
    validate_password(&req.password)
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::bad_request(
            "password must be at least 8 characters",
        ));
    }
    Ok(())
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_new_user(&req)?;

    let user = state
        .db
        .users()
        .register(req.username.trim(), &req.email, &req.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
        }),
    ))
}

async fn issue_tokens(state: &AppState, user_id: Uuid) -> Result<TokenResponse, ApiError> {
    let access_token = state.sessions.issue_access(user_id)?;
    let refresh_token = SessionIssuer::new_refresh_token();
    state
        .db
        .users()
        .store_refresh_token(user_id, &refresh_token, state.config.auth.refresh_ttl_days)
        .await?;

    Ok(TokenResponse {
        access_token,
        refresh_token,
    })
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state.db.users().identify(&req.email, &req.password).await?;
    let tokens = issue_tokens(&state, user.id).await?;
    Ok(Json(tokens))
}

/// Rotate a refresh token: the presented token is revoked and a fresh
/// pair is issued.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user_id = state
        .db
        .users()
        .user_for_refresh_token(&req.refresh_token)
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    state
        .db
        .users()
        .revoke_refresh_token(&req.refresh_token)
        .await?;

    let tokens = issue_tokens(&state, user_id).await?;
    Ok(Json(tokens))
}

pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .db
        .users()
        .find_by_id(user_id)
        .await?
        .ok_or(crate::error::CoreError::UserNotFound)?;

    Ok(Json(UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
    }))
}

pub async fn update_username(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<UpdateUsernameRequest>,
) -> Result<StatusCode, ApiError> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(ApiError::bad_request("username is required"));
    }

    state.db.users().set_username(user_id, username).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    validate_password(&req.password)?;

    state.db.users().set_password(user_id, &req.password).await?;
    Ok(StatusCode::NO_CONTENT)
}
