//! Admin user domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use malmequer_core::{AdminUserId, Email};

pub use malmequer_core::AdminRole;

/// An admin user (domain type).
///
/// The password hash never leaves the repository layer.
#[derive(Debug, Clone, Serialize)]
pub struct AdminUser {
    pub id: AdminUserId,
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
