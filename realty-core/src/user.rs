//! User roles

use serde::{Deserialize, Serialize};

use crate::Error;

/// Role of a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(Error::UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Role to write when syncing a user at login.
///
/// The configured owner is (re)promoted on every sync. Everyone else keeps
/// whatever role they already have (`None`); demotion never happens here.
pub fn role_on_sync(open_id: &str, owner_open_id: Option<&str>) -> Option<Role> {
    match owner_open_id {
        Some(owner) if !owner.is_empty() && owner == open_id => Some(Role::Admin),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_promoted() {
        assert_eq!(role_on_sync("owner-1", Some("owner-1")), Some(Role::Admin));
        assert_eq!(role_on_sync("someone", Some("owner-1")), None);
        assert_eq!(role_on_sync("someone", None), None);
        assert_eq!(role_on_sync("", Some("")), None);
    }

    #[test]
    fn test_role_round_trip_strings() {
        assert_eq!(Role::parse("admin").unwrap(), Role::Admin);
        assert!(Role::parse("superuser").is_err());
    }
}
