//! Database migration commands.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - connection string for the `shop` schema
//! - `ADMIN_DATABASE_URL` - connection string for the `admin` schema
//!
//! Both fall back to `DATABASE_URL`. The admin API reads the `shop` schema,
//! so in practice both point at the same database.
//!
//! # Migration Files
//!
//! Storefront migrations: `crates/storefront/migrations/`
//! Admin migrations: `crates/admin/migrations/`

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use thiserror::Error;

use super::{MissingEnvVar, database_url};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn storefront() -> Result<(), MigrationError> {
    run(
        "storefront",
        "STOREFRONT_DATABASE_URL",
        sqlx::migrate!("../storefront/migrations"),
    )
    .await
}

/// Run admin database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn admin() -> Result<(), MigrationError> {
    run("admin", "ADMIN_DATABASE_URL", sqlx::migrate!("../admin/migrations")).await
}

async fn run(
    name: &str,
    env_var: &'static str,
    mut migrator: Migrator,
) -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();
    let url = database_url(env_var)?;

    tracing::info!("Connecting to {name} database...");
    let pool = PgPool::connect(url.expose_secret()).await?;

    // Both sets share one `_sqlx_migrations` table.
    migrator.set_ignore_missing(true);

    tracing::info!("Running {name} migrations...");
    migrator.run(&pool).await?;

    tracing::info!("{name} migrations complete");
    Ok(())
}
