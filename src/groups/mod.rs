//! The group membership and moderation engine.
//!
//! [`roles`] defines the closed role set, [`invite`] the code grammar,
//! [`authz`] the canonical authorization checks, and [`moderation`] the
//! kick/ban state machine. This module wires them into the operations
//! the HTTP layer calls.
//!
//! Concurrency: every operation is a short-lived unit of work against
//! the database, with no in-process shared state. Join is check-then-act
//! resolved by the ledger's idempotent insert; leave/promote/moderate
//! accept a narrow check-then-act race window on the same (user, group)
//! pair, trading strict serializability for throughput on a
//! low-contention path. Callers that need stricter guarantees must
//! serialize at the storage layer.

pub mod authz;
pub mod invite;
pub mod moderation;
pub mod roles;

use crate::db::{Database, GroupRecord, MemberProfile};
use crate::error::CoreError;
use roles::Role;
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;

/// Default maximum length of a group's rules text, in bytes.
pub const RULES_MAX_LEN: usize = 1500;

/// How many fresh codes to try before reporting a collision.
const INVITE_CODE_ATTEMPTS: u32 = 3;

/// Result of joining a group.
#[derive(Debug, Clone)]
pub struct JoinedGroup {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub group_name: String,
    pub role: Role,
}

/// A moderation action an admin can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModAction {
    Kick,
    Ban,
}

impl FromStr for ModAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kick" => Ok(ModAction::Kick),
            "ban" => Ok(ModAction::Ban),
            other => Err(other.to_string()),
        }
    }
}

/// Create a group and atomically enroll the creator as its sole admin.
///
/// If enrollment fails the group row is deleted again: a group must
/// never exist without an accessible admin. Invite-code collisions are
/// retried with fresh codes a few times, then reported.
pub async fn create_group(
    db: &Database,
    owner_id: Uuid,
    name: &str,
    description: Option<&str>,
) -> Result<GroupRecord, CoreError> {
    let mut attempt = 0;
    let group = loop {
        attempt += 1;
        let code = invite::generate("");
        match db
            .groups()
            .create(name, description, Some(owner_id), &code)
            .await
        {
            Ok(group) => break group,
            Err(crate::db::DbError::InviteCodeTaken(code)) => {
                warn!(code = %code, attempt, "Invite code collision on group creation");
                if attempt >= INVITE_CODE_ATTEMPTS {
                    return Err(CoreError::InviteCodeCollision);
                }
            }
            Err(e) => return Err(e.into()),
        }
    };

    if let Err(e) = db.members().add(owner_id, group.id, Role::Admin).await {
        // No orphan groups without an accessible admin.
        let _ = db.groups().delete(group.id).await;
        return Err(e.into());
    }

    info!(group_id = %group.id, owner_id = %owner_id, name = %group.name, "Group created");
    Ok(group)
}

/// Join a group via its invite code.
///
/// A user with an existing ledger row is handled through the moderation
/// status: banned fails permanently, an active kick fails with the
/// remaining window, and an expired kick is lazily reinstated and then
/// reported as already-a-member -- the row is never re-inserted.
pub async fn join_via_code(
    db: &Database,
    user_id: Uuid,
    invite_code: &str,
) -> Result<JoinedGroup, CoreError> {
    let group = db
        .groups()
        .find_by_invite_code(invite_code)
        .await?
        .ok_or(CoreError::GroupNotFound)?;

    if db.members().get(user_id, group.id).await?.is_some() {
        let status = moderation::check_status(db, user_id, group.id).await?;
        return match status.active_sanction() {
            Some(sanction) => Err(CoreError::SanctionActive(sanction)),
            None => Err(CoreError::AlreadyMember),
        };
    }

    db.members().add(user_id, group.id, Role::Member).await?;
    info!(user_id = %user_id, group_id = %group.id, "User joined group");

    Ok(JoinedGroup {
        user_id,
        group_id: group.id,
        group_name: group.name,
        role: Role::Member,
    })
}

/// Leave a group, subject to the only-admin and last-member invariants.
pub async fn leave_group(db: &Database, user_id: Uuid, group_id: Uuid) -> Result<(), CoreError> {
    authz::can_leave(db, user_id, group_id).await?;

    db.members().remove(user_id, group_id).await?;
    info!(user_id = %user_id, group_id = %group_id, "User left group");
    Ok(())
}

/// Set a member's role, subject to [`authz::can_promote`].
pub async fn promote_user(
    db: &Database,
    actor_id: Uuid,
    target_id: Uuid,
    group_id: Uuid,
    new_role: &str,
) -> Result<Role, CoreError> {
    let role = authz::can_promote(db, actor_id, target_id, group_id, new_role).await?;

    db.members().set_role(target_id, group_id, role).await?;
    info!(user_id = %target_id, group_id = %group_id, role = %role, by = %actor_id, "Role changed");
    Ok(role)
}

/// Apply a moderation action to a member.
pub async fn moderate_user(
    db: &Database,
    admin_id: Uuid,
    target_id: Uuid,
    group_id: Uuid,
    action: ModAction,
    reason: &str,
) -> Result<(), CoreError> {
    match action {
        ModAction::Kick => {
            moderation::kick(db, admin_id, target_id, group_id, reason).await?;
        }
        ModAction::Ban => {
            moderation::ban(db, admin_id, target_id, group_id, reason).await?;
        }
    }
    Ok(())
}

/// Rotate a group's invite code to a fresh one with an admin-supplied
/// prefix.
///
/// The prefix is trimmed and uppercased, then validated against the
/// code grammar; every violated rule is reported at once.
pub async fn rotate_invite_code(
    db: &Database,
    actor_id: Uuid,
    group_id: Uuid,
    custom_prefix: &str,
) -> Result<String, CoreError> {
    authz::is_admin(db, actor_id, group_id).await?;

    let prefix = custom_prefix.trim().to_uppercase();
    invite::validate_prefix(&prefix).map_err(CoreError::InviteCodeInvalid)?;

    let mut attempt = 0;
    loop {
        attempt += 1;
        let code = invite::generate(&prefix);
        match db.groups().set_invite_code(group_id, &code).await {
            Ok(()) => {
                info!(group_id = %group_id, by = %actor_id, "Invite code rotated");
                return Ok(code);
            }
            Err(crate::db::DbError::InviteCodeTaken(code)) => {
                warn!(code = %code, attempt, "Invite code collision on rotation");
                if attempt >= INVITE_CODE_ATTEMPTS {
                    return Err(CoreError::InviteCodeCollision);
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Replace a group's rules text (admin only, bounded length).
pub async fn update_rules(
    db: &Database,
    actor_id: Uuid,
    group_id: Uuid,
    rules: &str,
    max_len: usize,
) -> Result<(), CoreError> {
    authz::is_admin(db, actor_id, group_id).await?;

    if rules.len() > max_len {
        return Err(CoreError::RulesTooLong { limit: max_len });
    }

    db.groups().set_rules(group_id, rules).await?;
    Ok(())
}

/// Fetch a group for one of its members.
pub async fn group_for_member(
    db: &Database,
    user_id: Uuid,
    group_id: Uuid,
) -> Result<GroupRecord, CoreError> {
    if !authz::is_member(db, user_id, group_id).await? {
        return Err(CoreError::NotMember);
    }

    db.groups()
        .find_by_id(group_id)
        .await?
        .ok_or(CoreError::GroupNotFound)
}

/// List a group's active members (sanctioned members excluded), for
/// one of its members.
pub async fn active_members(
    db: &Database,
    user_id: Uuid,
    group_id: Uuid,
) -> Result<Vec<MemberProfile>, CoreError> {
    if !authz::is_member(db, user_id, group_id).await? {
        return Err(CoreError::NotMember);
    }

    Ok(db.members().active_members(group_id).await?)
}

/// All groups a user belongs to.
pub async fn groups_for_user(
    db: &Database,
    user_id: Uuid,
) -> Result<Vec<GroupRecord>, CoreError> {
    let ids = db.members().groups_for_user(user_id).await?;
    let mut groups = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(group) = db.groups().find_by_id(id).await? {
            groups.push(group);
        }
    }
    Ok(groups)
}

/// Delete a group entirely. Admin only; membership rows and posts
/// cascade.
pub async fn delete_group(db: &Database, actor_id: Uuid, group_id: Uuid) -> Result<(), CoreError> {
    authz::is_admin(db, actor_id, group_id).await?;

    if !db.groups().delete(group_id).await? {
        return Err(CoreError::GroupNotFound);
    }
    info!(group_id = %group_id, by = %actor_id, "Group deleted");
    Ok(())
}
