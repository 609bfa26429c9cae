//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use malmequer_core::{Email, UserId};

/// A registered customer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
