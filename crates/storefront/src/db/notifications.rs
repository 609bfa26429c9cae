//! Per-user notification settings.

use sqlx::PgPool;

use malmequer_core::UserId;
use malmequer_core::notifications::NotificationPreferences;

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct SettingsRow {
    order_updates: bool,
    promotions: bool,
    newsletter: bool,
    back_in_stock: bool,
}

impl From<SettingsRow> for NotificationPreferences {
    fn from(r: SettingsRow) -> Self {
        Self {
            order_updates: r.order_updates,
            promotions: r.promotions,
            newsletter: r.newsletter,
            back_in_stock: r.back_in_stock,
        }
    }
}

pub struct NotificationSettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationSettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Stored settings, if the user has a row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: UserId,
    ) -> Result<Option<NotificationPreferences>, RepositoryError> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r"
            SELECT order_updates, promotions, newsletter, back_in_stock
            FROM shop.notification_settings
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Settings for the user, inserting the defaults on first read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(
        &self,
        user_id: UserId,
    ) -> Result<NotificationPreferences, RepositoryError> {
        let defaults = NotificationPreferences::default();
        let row = sqlx::query_as::<_, SettingsRow>(
            r"
            INSERT INTO shop.notification_settings
                (user_id, order_updates, promotions, newsletter, back_in_stock)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING order_updates, promotions, newsletter, back_in_stock
            ",
        )
        .bind(user_id)
        .bind(defaults.order_updates)
        .bind(defaults.promotions)
        .bind(defaults.newsletter)
        .bind(defaults.back_in_stock)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        user_id: UserId,
        prefs: &NotificationPreferences,
    ) -> Result<NotificationPreferences, RepositoryError> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r"
            INSERT INTO shop.notification_settings
                (user_id, order_updates, promotions, newsletter, back_in_stock)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE
            SET order_updates = EXCLUDED.order_updates,
                promotions = EXCLUDED.promotions,
                newsletter = EXCLUDED.newsletter,
                back_in_stock = EXCLUDED.back_in_stock,
                updated_at = now()
            RETURNING order_updates, promotions, newsletter, back_in_stock
            ",
        )
        .bind(user_id)
        .bind(prefs.order_updates)
        .bind(prefs.promotions)
        .bind(prefs.newsletter)
        .bind(prefs.back_in_stock)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }
}
