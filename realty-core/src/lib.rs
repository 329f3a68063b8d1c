//! Realty Core Library
//!
//! Domain rules for the realty marketplace, free of any I/O:
//! - Session tokens carry the caller's identity between requests
//! - Cookie policy decides how session cookies are set and cleared
//! - Viewings move through an admin-driven status lifecycle
//! - Properties are browsed through typed filters

pub mod cookies;
pub mod error;
pub mod property;
pub mod session;
pub mod user;
pub mod viewing;

pub use cookies::{CookiePolicy, SameSite, Transport};
pub use error::Error;
pub use property::{
    Property, PropertyFilter, PropertyImage, PropertyInput, PropertyStatus, PropertyUpdate,
};
pub use session::{session_ttl, SessionClaims, SessionCodec, SESSION_TTL_SECS};
pub use user::Role;
pub use viewing::{NewViewing, Viewing, ViewingFilter, ViewingStatus};

/// Result type for realty-core operations
pub type Result<T> = std::result::Result<T, Error>;
