//! Data models for marketplace storage

use chrono::{DateTime, Utc};
use realty_core::{PropertyFilter, Role};
use serde::{Deserialize, Serialize};

/// Unique user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// A user account, created by the OAuth callback or local registration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    /// Stable external identity, the join key for session claims
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Only set for local (email + password) accounts
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub login_method: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_signed_in: DateTime<Utc>,
}

/// Insert-or-update of a user keyed by `open_id`.
///
/// `None` fields keep the stored value on update. `role: None` keeps the
/// stored role (or `user` for a new row).
#[derive(Debug, Clone, Default)]
pub struct UpsertUser {
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub login_method: Option<String>,
    pub role: Option<Role>,
}

/// A property a user marked as favorite
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: i64,
    pub user_id: UserId,
    pub property_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A named property filter a user can re-run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearch {
    pub id: i64,
    pub user_id: UserId,
    pub name: String,
    pub filter: PropertyFilter,
    pub created_at: DateTime<Utc>,
}

/// A property in a user's comparison list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonEntry {
    pub id: i64,
    pub user_id: UserId,
    pub property_id: i64,
    pub created_at: DateTime<Utc>,
}
