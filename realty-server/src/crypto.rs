//! Password and token helpers for local accounts and the admin gate

use crate::error::AppError;

/// bcrypt work factor for stored password hashes
pub const BCRYPT_COST: u32 = 12;

pub const MIN_PASSWORD_LEN: usize = 8;
/// bcrypt ignores input past 72 bytes; 80 characters is the accepted ceiling
pub const MAX_PASSWORD_LEN: usize = 80;

/// Reject passwords outside the accepted length range
pub fn check_password_length(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "password must be {} to {} characters",
            MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
        )))
    }
}

/// Hash a new local-account password
pub fn hash_password(password: &str) -> Result<String, AppError> {
    check_password_length(password)?;
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| AppError::Internal(e.to_string()))
}

/// Check a login attempt against a stored hash. A malformed hash counts as
/// a mismatch.
pub fn password_matches(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::error!(error = %e, "Stored password hash is unreadable");
            false
        }
    }
}

/// Identity for an account created by email registration rather than OAuth
pub fn generate_local_open_id() -> String {
    format!("local:{}", uuid::Uuid::new_v4())
}

/// Compare two secrets without short-circuiting on the first differing byte
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashed_password_matches_only_itself() {
        let hash = hash_password("open sesame, please").unwrap();

        assert!(password_matches("open sesame, please", &hash));
        assert!(!password_matches("open sesame", &hash));
        assert!(!password_matches("open sesame, please", "not-a-bcrypt-hash"));
    }

    #[test]
    fn test_length_limits_are_inclusive() {
        assert!(check_password_length(&"a".repeat(MIN_PASSWORD_LEN)).is_ok());
        assert!(check_password_length(&"a".repeat(MAX_PASSWORD_LEN)).is_ok());
        assert!(check_password_length(&"a".repeat(MIN_PASSWORD_LEN - 1)).is_err());
        assert!(matches!(
            hash_password(&"a".repeat(MAX_PASSWORD_LEN + 1)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_local_open_ids_are_unique() {
        let a = generate_local_open_id();
        let b = generate_local_open_id();
        assert!(a.starts_with("local:"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"token", b"token"));
        assert!(!constant_time_eq(b"token", b"tokem"));
        assert!(!constant_time_eq(b"token", b"token-longer"));
        assert!(constant_time_eq(b"", b""));
    }
}
