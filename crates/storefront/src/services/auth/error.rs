//! Customer account errors.

use thiserror::Error;

use malmequer_core::EmailError;

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Wrong password or unknown email; the two are not told apart.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The session points at an account that no longer exists.
    #[error("user not found")]
    UserNotFound,

    #[error("an account with this email already exists")]
    UserAlreadyExists,

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("database error: {0}")]
    Repository(RepositoryError),

    #[error("password hashing error")]
    PasswordHash,
}

/// A unique-constraint conflict on the user table means the email is taken.
impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(_) => Self::UserAlreadyExists,
            other => Self::Repository(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_means_email_taken() {
        let err = AuthError::from(RepositoryError::Conflict("user_email_key".into()));
        assert!(matches!(err, AuthError::UserAlreadyExists));

        let err = AuthError::from(RepositoryError::NotFound);
        assert!(matches!(err, AuthError::Repository(RepositoryError::NotFound)));
    }

    #[test]
    fn test_password_message_names_minimum() {
        assert_eq!(
            AuthError::PasswordTooShort { min: 8 }.to_string(),
            "password must be at least 8 characters"
        );
    }
}
