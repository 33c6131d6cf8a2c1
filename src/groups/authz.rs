//! The canonical authorization checks.
//!
//! Every action path consults these predicates; there is exactly one
//! definition of "is a member", "is an admin", and so on. Check order
//! within each predicate is part of the contract: callers rely on
//! deterministic error reporting.

use crate::db::{Database, PostRecord};
use crate::error::CoreError;
use crate::groups::moderation::{self, SanctionStatus};
use crate::groups::roles::Role;
use std::str::FromStr;
use uuid::Uuid;

/// Whether a user currently counts as a member of a group.
///
/// A user with a ledger row who is banned or under an active kick is
/// **not** a member for authorization purposes; this returns `false`
/// rather than an error so general gating treats them like outsiders.
/// The join flow uses [`moderation::check_status`] directly when it
/// needs to distinguish "never joined" from "sanctioned". Passing
/// through the status check here also applies lazy reinstatement of
/// expired kicks.
pub async fn is_member(db: &Database, user_id: Uuid, group_id: Uuid) -> Result<bool, CoreError> {
    if db.members().get(user_id, group_id).await?.is_none() {
        return Ok(false);
    }

    let status = moderation::check_status(db, user_id, group_id).await?;
    Ok(matches!(status, SanctionStatus::Clear))
}

/// Fail with [`CoreError::NotAdmin`] unless the user holds the admin
/// role in the group.
pub async fn is_admin(db: &Database, user_id: Uuid, group_id: Uuid) -> Result<(), CoreError> {
    match db.members().role_of(user_id, group_id).await? {
        Some(Role::Admin) => Ok(()),
        _ => Err(CoreError::NotAdmin),
    }
}

/// Check that `actor` may set `target`'s role to `new_role`.
///
/// Order: actor must be admin, target must be a member, the role must
/// be valid, and it must differ from the target's current role. On
/// success returns the parsed role to apply.
pub async fn can_promote(
    db: &Database,
    actor_id: Uuid,
    target_id: Uuid,
    group_id: Uuid,
    new_role: &str,
) -> Result<Role, CoreError> {
    is_admin(db, actor_id, group_id).await?;

    if !is_member(db, target_id, group_id).await? {
        return Err(CoreError::NotMember);
    }

    let role =
        Role::from_str(new_role).map_err(|e| CoreError::InvalidRole(e.0))?;

    let current = db
        .members()
        .role_of(target_id, group_id)
        .await?
        .ok_or(CoreError::NotMember)?;
    if current == role {
        return Err(CoreError::AlreadyHasRole(role));
    }

    Ok(role)
}

/// Check that a user may leave a group.
///
/// Order: membership, then the sole-special-role-holder check, then the
/// sole-member check. A user who is both the only member and the only
/// admin gets [`CoreError::OnlyAdmin`]: the special-role check is
/// evaluated first, and tests pin that tie-break down.
pub async fn can_leave(db: &Database, user_id: Uuid, group_id: Uuid) -> Result<(), CoreError> {
    if !is_member(db, user_id, group_id).await? {
        return Err(CoreError::NotMember);
    }

    let special = db.members().special_role_holders(group_id).await?;
    if special.len() == 1 && special[0].0 == user_id {
        return Err(CoreError::OnlyAdmin);
    }

    let members = db.members().members_of(group_id).await?;
    if members.len() == 1 {
        return Err(CoreError::LastMember);
    }

    Ok(())
}

/// Check that a user may delete a post in a group.
///
/// A member may always delete their own post; otherwise they must be a
/// group admin. Any other member is unauthorized.
pub async fn can_delete_post(
    db: &Database,
    user_id: Uuid,
    post: &PostRecord,
    group_id: Uuid,
) -> Result<(), CoreError> {
    if !is_member(db, user_id, group_id).await? {
        return Err(CoreError::NotMember);
    }

    if post.user_id == user_id {
        return Ok(());
    }

    match is_admin(db, user_id, group_id).await {
        Ok(()) => Ok(()),
        Err(CoreError::NotAdmin) => Err(CoreError::UnauthorizedDelete),
        Err(e) => Err(e),
    }
}

/// Check that an admin may apply a sanction to a target member.
///
/// An admin is never a valid moderation target, which also blocks an
/// admin sanctioning themselves.
pub async fn can_moderate(
    db: &Database,
    admin_id: Uuid,
    target_id: Uuid,
    group_id: Uuid,
) -> Result<(), CoreError> {
    is_admin(db, admin_id, group_id).await?;

    if !is_member(db, target_id, group_id).await? {
        return Err(CoreError::NotMember);
    }

    if db.members().role_of(target_id, group_id).await? == Some(Role::Admin) {
        return Err(CoreError::CannotModerateAdmin);
    }

    Ok(())
}
