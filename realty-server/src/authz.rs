//! Authorization gate for RPC operations

use crate::error::AppError;
use crate::store::User;

/// Require a resolved session
pub fn require_user(user: Option<User>) -> Result<User, AppError> {
    user.ok_or(AppError::NotAuthenticated)
}

/// Reject anyone whose role is not exactly `admin`
pub fn ensure_admin(user: &User) -> Result<(), AppError> {
    if user.role.is_admin() {
        Ok(())
    } else {
        tracing::warn!(open_id = %user.open_id, "Non-admin called an admin operation");
        Err(AppError::Forbidden)
    }
}

/// Require a resolved session belonging to an admin
pub fn require_admin(user: Option<User>) -> Result<User, AppError> {
    let user = require_user(user)?;
    ensure_admin(&user)?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::UserId;
    use chrono::Utc;
    use realty_core::Role;

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: UserId(1),
            open_id: "u1".into(),
            name: None,
            email: None,
            phone: None,
            password_hash: None,
            login_method: None,
            role,
            created_at: now,
            updated_at: now,
            last_signed_in: now,
        }
    }

    #[test]
    fn test_admin_gate() {
        assert!(matches!(require_admin(None), Err(AppError::NotAuthenticated)));
        assert!(matches!(
            require_admin(Some(user(Role::User))),
            Err(AppError::Forbidden)
        ));
        assert!(require_admin(Some(user(Role::Admin))).is_ok());
    }
}
