//! Group lifecycle, membership, and moderation handlers.

use super::{ApiError, AppState, AuthUser};
use crate::db::GroupRecord;
use crate::groups::{self, ModAction, invite};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize)]
pub struct GroupResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
    pub invite_code: String,
    pub rules: String,
}

impl From<GroupRecord> for GroupResponse {
    fn from(g: GroupRecord) -> Self {
        Self {
            id: g.id,
            name: g.name,
            description: g.description,
            owner_id: g.owner_id,
            invite_code: g.invite_code,
            rules: g.rules_info,
        }
    }
}

#[derive(Serialize)]
pub struct JoinResponse {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub group_name: String,
    pub role: String,
}

#[derive(Deserialize)]
pub struct PromoteRequest {
    pub target_user_id: Uuid,
    pub role: String,
}

#[derive(Deserialize)]
pub struct ModerateRequest {
    pub target_user_id: Uuid,
    pub action: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize)]
pub struct InviteCodeRequest {
    pub prefix: String,
}

#[derive(Serialize)]
pub struct InviteCodeResponse {
    pub invite_code: String,
}

#[derive(Deserialize)]
pub struct RulesRequest {
    pub rules: String,
}

#[derive(Serialize)]
pub struct MemberResponse {
    pub user_id: Uuid,
    pub role: String,
    pub username: String,
    pub email: String,
}

pub async fn create_group(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupResponse>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("group name is required"));
    }

    let description = match req.description.trim() {
        "" => None,
        desc => Some(desc),
    };

    let group =
        groups::create_group(&state.db, user_id, req.name.trim(), description).await?;
    Ok((StatusCode::CREATED, Json(group.into())))
}

pub async fn join_group(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(invite_code): Path<String>,
) -> Result<Json<JoinResponse>, ApiError> {
    let code = invite::parse_code(&invite_code)
        .ok_or_else(|| ApiError::bad_request("invalid invite code format"))?;

    let joined = groups::join_via_code(&state.db, user_id, &code).await?;
    Ok(Json(JoinResponse {
        user_id: joined.user_id,
        group_id: joined.group_id,
        group_name: joined.group_name,
        role: joined.role.to_string(),
    }))
}

pub async fn get_group(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupResponse>, ApiError> {
    let group = groups::group_for_member(&state.db, user_id, group_id).await?;
    Ok(Json(group.into()))
}

pub async fn delete_group(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    groups::delete_group(&state.db, user_id, group_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn leave_group(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    groups::leave_group(&state.db, user_id, group_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn promote_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<Uuid>,
    Json(req): Json<PromoteRequest>,
) -> Result<StatusCode, ApiError> {
    groups::promote_user(&state.db, user_id, req.target_user_id, group_id, &req.role).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn moderate_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<Uuid>,
    Json(req): Json<ModerateRequest>,
) -> Result<StatusCode, ApiError> {
    let action = ModAction::from_str(&req.action)
        .map_err(|a| ApiError::bad_request(format!("invalid moderation action: {a}")))?;

    groups::moderate_user(
        &state.db,
        user_id,
        req.target_user_id,
        group_id,
        action,
        &req.reason,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn rotate_invite_code(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<Uuid>,
    Json(req): Json<InviteCodeRequest>,
) -> Result<Json<InviteCodeResponse>, ApiError> {
    let invite_code =
        groups::rotate_invite_code(&state.db, user_id, group_id, &req.prefix).await?;
    Ok(Json(InviteCodeResponse { invite_code }))
}

pub async fn update_rules(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<Uuid>,
    Json(req): Json<RulesRequest>,
) -> Result<StatusCode, ApiError> {
    groups::update_rules(
        &state.db,
        user_id,
        group_id,
        &req.rules,
        state.config.limits.rules_max_len,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<MemberResponse>>, ApiError> {
    let members = groups::active_members(&state.db, user_id, group_id).await?;
    Ok(Json(
        members
            .into_iter()
            .map(|m| MemberResponse {
                user_id: m.user_id,
                role: m.role.to_string(),
                username: m.username,
                email: m.email,
            })
            .collect(),
    ))
}

pub async fn my_groups(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<GroupResponse>>, ApiError> {
    let groups = groups::groups_for_user(&state.db, user_id).await?;
    Ok(Json(groups.into_iter().map(Into::into).collect()))
}
