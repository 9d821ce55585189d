//! Account error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// No email was given.
    #[error("email is required")]
    EmptyEmail,

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] enf_core::EmailError),

    /// A superuser was requested with a privilege flag switched off.
    #[error("superuser must have {0}=true")]
    SuperuserFlags(&'static str),

    /// Invalid credentials (wrong password, unknown or inactive user).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Email or phone already taken.
    #[error("{0}")]
    AlreadyExists(String),

    /// Password too weak.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
