//! The closed set of membership roles.
//!
//! Modeled as an enum rather than a runtime role list so no request
//! path can mutate the valid set.

use std::str::FromStr;

/// Role of a user within one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    /// Stable string form, as stored in the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    /// Whether this role grants administrative authority.
    /// Everything except the default `member` role is special.
    pub fn is_special(&self) -> bool {
        !matches!(self, Role::Member)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a role name outside the valid set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRoleName(pub String);

impl FromStr for Role {
    type Err = InvalidRoleName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            other => Err(InvalidRoleName(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Member".parse::<Role>().unwrap(), Role::Member);
        assert_eq!(Role::Admin.as_str(), "admin");
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!("owner".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_special_roles() {
        assert!(Role::Admin.is_special());
        assert!(!Role::Member.is_special());
    }
}
