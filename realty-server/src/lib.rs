//! Realty marketplace server
//!
//! Public property browsing, per-user collections, viewing requests with
//! visitor notifications, and an admin back office, behind OAuth sessions.

pub mod authz;
pub mod config;
pub mod crypto;
pub mod error;
pub mod notify;
pub mod oauth;
pub mod routes;
pub mod state;
pub mod store;
pub mod viewings;

pub use config::Config;
pub use error::AppError;
pub use notify::{
    CancellationNotice, ConfirmationNotice, ConsoleNotifier, Notifier, SmtpConfig, SmtpNotifier,
};
pub use oauth::{HttpIdentityProvider, IdentityProvider, TokenResponse, UserInfo};
pub use state::AppState;
pub use store::{InMemoryStore, SqliteStore, Store};
pub use viewings::{BulkOutcome, ViewingManager};
