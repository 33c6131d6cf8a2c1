//! Post and comment handlers.

use super::{ApiError, AppState, AuthUser};
use crate::db::{CommentRecord, PostRecord, PostSummary};
use crate::posts;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

#[derive(Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: i64,
}

impl From<PostRecord> for PostResponse {
    fn from(p: PostRecord) -> Self {
        Self {
            id: p.id,
            group_id: p.group_id,
            user_id: p.user_id,
            content: p.content,
            created_at: p.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct FeedEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author: String,
    pub content: String,
    pub created_at: i64,
    pub comment_count: i64,
}

impl From<PostSummary> for FeedEntry {
    fn from(p: PostSummary) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            author: p.author,
            content: p.content,
            created_at: p.created_at,
            comment_count: p.comment_count,
        }
    }
}

#[derive(Deserialize)]
pub struct FeedQuery {
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author: String,
    pub content: String,
    pub created_at: i64,
}

impl From<CommentRecord> for CommentResponse {
    fn from(c: CommentRecord) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            author: c.author,
            content: c.content,
            created_at: c.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct PostWithCommentsResponse {
    #[serde(flatten)]
    pub post: PostResponse,
    pub comments: Vec<CommentResponse>,
}

fn validate_content(content: &str) -> Result<(), ApiError> {
    if content.trim().is_empty() {
        return Err(ApiError::bad_request("post content is required"));
    }
    Ok(())
}

pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<Uuid>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    validate_content(&req.content)?;

    let post = posts::create_post(&state.db, user_id, group_id, req.content.trim()).await?;
    Ok((StatusCode::CREATED, Json(post.into())))
}

pub async fn post_feed(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<Uuid>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<FeedEntry>>, ApiError> {
    let limit = query.limit.unwrap_or(state.config.limits.feed_limit);

    let feed = posts::post_feed(&state.db, user_id, group_id, limit, query.offset).await?;
    Ok(Json(feed.into_iter().map(Into::into).collect()))
}

pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((group_id, post_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    posts::delete_post(&state.db, user_id, group_id, post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<PostWithCommentsResponse>, ApiError> {
    let (post, comments) = posts::post_with_comments(&state.db, user_id, post_id).await?;
    Ok(Json(PostWithCommentsResponse {
        post: post.into(),
        comments: comments.into_iter().map(Into::into).collect(),
    }))
}

pub async fn create_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(post_id): Path<Uuid>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    validate_content(&req.content)?;

    let comment = posts::create_comment(&state.db, user_id, post_id, req.content.trim()).await?;
    Ok((StatusCode::CREATED, Json(comment.into())))
}
