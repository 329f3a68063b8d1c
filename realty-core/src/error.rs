//! Error types for the realty domain

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Session secret is not configured")]
    MissingSecret,

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Session token expired")]
    TokenExpired,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown {kind} value: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("Session token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}
