//! Database operations for the back office.
//!
//! # Schemas
//!
//! - `admin` - `admin_user`, `activity_log`, `session` (owned by this crate)
//! - `shop` - catalog, stock and orders, edited here and read by the storefront
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p malmequer-cli -- migrate admin
//! ```

pub mod activity_log;
pub mod admin_users;
pub mod categories;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod reports;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use activity_log::ActivityLogRepository;
pub use admin_users::AdminUserRepository;
pub use categories::CategoryRepository;
pub use dashboard::DashboardRepository;
pub use orders::AdminOrderRepository;
pub use products::ProductRepository;
pub use reports::ReportRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_unique_violation(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(e)
    }
}

impl From<malmequer_storefront::db::RepositoryError> for RepositoryError {
    fn from(err: malmequer_storefront::db::RepositoryError) -> Self {
        use malmequer_storefront::db::RepositoryError as Shop;
        match err {
            Shop::Database(e) => Self::Database(e),
            Shop::DataCorruption(msg) => Self::DataCorruption(msg),
            Shop::NotFound => Self::NotFound,
            Shop::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
