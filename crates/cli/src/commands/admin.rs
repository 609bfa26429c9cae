//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! mq-cli admin create -e ops@malmequer.pt -n "Ops" -r super_admin
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` (or `DATABASE_URL`)
//! - `ADMIN_PASSWORD` - used when `--password` is not given

use malmequer_admin::db;
use malmequer_admin::services::{AdminAuthService, AuthError};
use malmequer_core::AdminRole;
use thiserror::Error;

use super::{MissingEnvVar, database_url};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid role: {0}. Valid roles: super_admin, admin, viewer")]
    InvalidRole(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a new admin user with a password and return its id.
///
/// # Errors
///
/// Returns an error for an unknown role, an invalid email, a short password
/// or an email that is already taken.
pub async fn create_user(
    email: &str,
    name: &str,
    role: &str,
    password: &str,
) -> Result<i32, AdminError> {
    dotenvy::dotenv().ok();

    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;

    let url = database_url("ADMIN_DATABASE_URL")?;
    tracing::info!("Connecting to admin database...");
    let pool = db::create_pool(&url).await?;

    tracing::info!("Creating admin user: {} ({})", email, role);
    let admin = AdminAuthService::new(&pool)
        .create_admin(email, name, role, password)
        .await?;

    tracing::info!(
        "Admin user created. ID: {}, Email: {}, Role: {}",
        admin.id,
        admin.email,
        admin.role
    );
    Ok(admin.id.as_i32())
}
