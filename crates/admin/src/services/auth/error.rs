//! Admin authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] malmequer_core::EmailError),

    /// Wrong password, unknown email or an admin without a password.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("an admin with this email already exists")]
    AdminAlreadyExists,

    #[error("password validation failed: {0}")]
    WeakPassword(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing error")]
    PasswordHash,
}
