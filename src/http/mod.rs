//! HTTP API surface.
//!
//! Thin axum handlers over the core operations: they parse the request,
//! resolve the acting user from the session token, call into
//! [`crate::groups`] / [`crate::posts`], and translate the error
//! taxonomy into status codes. No authorization decision is made here.

mod groups;
mod posts;
mod users;

use crate::auth::{SessionError, SessionIssuer};
use crate::config::Config;
use crate::db::{Database, DbError};
use crate::error::CoreError;
use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub sessions: SessionIssuer,
    pub config: Arc<Config>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/users", post(users::create_user))
        .route("/api/login", post(users::login))
        .route("/api/refresh", post(users::refresh))
        .route("/api/users/username", put(users::update_username))
        .route("/api/users/password", put(users::update_password))
        .route("/api/users/me", get(users::me))
        .route("/api/users/me/groups", get(groups::my_groups))
        .route("/api/groups", post(groups::create_group))
        .route("/api/groups/join/:invite_code", post(groups::join_group))
        .route(
            "/api/groups/:group_id",
            get(groups::get_group).delete(groups::delete_group),
        )
        .route("/api/groups/:group_id/leave", post(groups::leave_group))
        .route("/api/groups/:group_id/promote", post(groups::promote_user))
        .route(
            "/api/groups/:group_id/moderate",
            post(groups::moderate_user),
        )
        .route(
            "/api/groups/:group_id/invite",
            put(groups::rotate_invite_code),
        )
        .route("/api/groups/:group_id/rules", put(groups::update_rules))
        .route("/api/groups/:group_id/members", get(groups::list_members))
        .route(
            "/api/groups/:group_id/posts",
            post(posts::create_post).get(posts::post_feed),
        )
        .route(
            "/api/groups/:group_id/posts/:post_id",
            delete(posts::delete_post),
        )
        .route("/api/posts/:post_id", get(posts::get_post))
        .route("/api/posts/:post_id/comments", post(posts::create_comment))
        .with_state(state)
}

/// An API error: status code plus a user-facing message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let status = match &err {
            CoreError::NotMember
            | CoreError::NotAdmin
            | CoreError::OnlyAdmin
            | CoreError::LastMember
            | CoreError::CannotModerateAdmin
            | CoreError::UnauthorizedDelete
            | CoreError::SanctionActive(_) => StatusCode::FORBIDDEN,
            CoreError::InvalidRole(_)
            | CoreError::AlreadyHasRole(_)
            | CoreError::InviteCodeInvalid(_)
            | CoreError::RulesTooLong { .. } => StatusCode::BAD_REQUEST,
            CoreError::AlreadyMember | CoreError::InviteCodeCollision => StatusCode::CONFLICT,
            CoreError::GroupNotFound | CoreError::PostNotFound | CoreError::UserNotFound => {
                StatusCode::NOT_FOUND
            }
            CoreError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if err.is_expected() {
            tracing::debug!(code = err.error_code(), "Request rejected");
            ApiError::new(status, err.to_string())
        } else {
            // Storage faults are logged with detail but surfaced opaquely.
            tracing::error!(error = %err, "Storage error while handling request");
            ApiError::new(status, "internal server error")
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::EmailExists(_) => ApiError::new(StatusCode::CONFLICT, err.to_string()),
            DbError::InvalidPassword => ApiError::unauthorized(),
            other => {
                tracing::error!(error = %other, "Storage error while handling request");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(_: SessionError) -> Self {
        ApiError::unauthorized()
    }
}

/// The authenticated user, resolved from the `Authorization: Bearer`
/// access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(ApiError::unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(ApiError::unauthorized)?;

        let user_id = state.sessions.validate_access(token)?;
        Ok(AuthUser(user_id))
    }
}
