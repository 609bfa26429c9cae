//! Admin activity log storage.

use sqlx::PgPool;

use malmequer_core::ActivityLogId;

use super::RepositoryError;
use crate::models::{ActivityEntry, ActivityQuery, NewActivity};

pub struct ActivityLogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ActivityLogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn append(&self, entry: &NewActivity) -> Result<ActivityLogId, RepositoryError> {
        let id = sqlx::query_scalar(
            r"
            INSERT INTO admin.activity_log (admin_user_id, action, entity_type, entity_id, details)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(entry.admin_user_id)
        .bind(entry.action)
        .bind(entry.entity_type)
        .bind(entry.entity_id.as_deref())
        .bind(&entry.details)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Newest entries first, optionally for one action.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, query: &ActivityQuery) -> Result<Vec<ActivityEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, ActivityEntry>(
            r"
            SELECT l.id, l.admin_user_id, u.name AS admin_name, l.action, l.entity_type,
                   l.entity_id, l.details, l.created_at
            FROM admin.activity_log l
            LEFT JOIN admin.admin_user u ON u.id = l.admin_user_id
            WHERE ($1::text IS NULL OR l.action = $1)
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT $2
            ",
        )
        .bind(query.action())
        .bind(query.limit())
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }
}
