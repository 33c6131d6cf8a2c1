//! Unified error handling for circled.
//!
//! Every expected, recoverable outcome of a group operation is a typed
//! variant here and is surfaced verbatim to the caller for translation
//! into a user-facing rejection. Storage failures travel separately as
//! [`crate::db::DbError`] and are reported opaquely.

use crate::db::DbError;
use crate::groups::roles::Role;
use thiserror::Error;

/// How long a sanction lasts, as seen by the sanctioned user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sanction {
    /// Kicked until the given unix timestamp.
    Until(i64),
    /// Banned with no automatic reinstatement.
    Permanent,
}

impl std::fmt::Display for Sanction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sanction::Until(ts) => write!(f, "until {ts}"),
            Sanction::Permanent => write!(f, "permanently"),
        }
    }
}

/// Errors produced by the membership, authorization, and moderation core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("user is not a member of the group")]
    NotMember,

    #[error("cannot leave group as the only admin")]
    OnlyAdmin,

    #[error("cannot leave group as the last member")]
    LastMember,

    #[error("invalid role specified: {0}")]
    InvalidRole(String),

    #[error("user already has the {0} role")]
    AlreadyHasRole(Role),

    #[error("user is not an admin of the group")]
    NotAdmin,

    #[error("cannot moderate an admin")]
    CannotModerateAdmin,

    #[error("user is already a member of the group")]
    AlreadyMember,

    #[error("user is not authorized to delete this post")]
    UnauthorizedDelete,

    #[error("user is kicked or banned from the group ({0})")]
    SanctionActive(Sanction),

    #[error("invalid invite code: {}", .0.join(", "))]
    InviteCodeInvalid(Vec<String>),

    #[error("invite code collision, please try again")]
    InviteCodeCollision,

    #[error("group rules cannot exceed {limit} characters")]
    RulesTooLong { limit: usize },

    #[error("no group found")]
    GroupNotFound,

    #[error("post not found")]
    PostNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error(transparent)]
    Db(#[from] DbError),
}

impl CoreError {
    /// Static error code used for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotMember => "not_member",
            Self::OnlyAdmin => "only_admin",
            Self::LastMember => "last_member",
            Self::InvalidRole(_) => "invalid_role",
            Self::AlreadyHasRole(_) => "already_has_role",
            Self::NotAdmin => "not_admin",
            Self::CannotModerateAdmin => "cannot_moderate_admin",
            Self::AlreadyMember => "already_member",
            Self::UnauthorizedDelete => "unauthorized_delete",
            Self::SanctionActive(_) => "sanction_active",
            Self::InviteCodeInvalid(_) => "invite_code_invalid",
            Self::InviteCodeCollision => "invite_code_collision",
            Self::RulesTooLong { .. } => "rules_too_long",
            Self::GroupNotFound => "group_not_found",
            Self::PostNotFound => "post_not_found",
            Self::UserNotFound => "user_not_found",
            Self::Db(_) => "storage_error",
        }
    }

    /// Whether this error is an expected, recoverable rejection rather
    /// than a server fault.
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Db(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CoreError::NotMember.error_code(), "not_member");
        assert_eq!(CoreError::OnlyAdmin.error_code(), "only_admin");
        assert_eq!(
            CoreError::SanctionActive(Sanction::Permanent).error_code(),
            "sanction_active"
        );
    }

    #[test]
    fn test_expected_vs_fault() {
        assert!(CoreError::LastMember.is_expected());
        assert!(CoreError::InviteCodeCollision.is_expected());
        assert!(!CoreError::Db(DbError::Internal("boom".into())).is_expected());
    }

    #[test]
    fn test_invite_code_invalid_joins_rules() {
        let err = CoreError::InviteCodeInvalid(vec![
            "Invite code is required".to_string(),
            "too short".to_string(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("Invite code is required"));
        assert!(msg.contains("too short"));
    }
}
