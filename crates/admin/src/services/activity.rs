//! Recording admin actions.

use serde_json::Value;
use sqlx::PgPool;

use crate::db::ActivityLogRepository;
use crate::models::{CurrentAdmin, NewActivity};

/// Append an activity log entry for `admin`.
///
/// The action being logged has already happened by the time this runs, so a
/// failed insert is reported to Sentry through `tracing::error!` and not
/// returned to the caller.
pub async fn record(
    pool: &PgPool,
    admin: &CurrentAdmin,
    action: &'static str,
    entity_type: &'static str,
    entity_id: Option<String>,
    details: Value,
) {
    let entry = NewActivity {
        admin_user_id: Some(admin.id),
        action,
        entity_type,
        entity_id,
        details,
    };

    match ActivityLogRepository::new(pool).append(&entry).await {
        Ok(id) => tracing::debug!(activity_id = %id, action, "Activity recorded"),
        Err(e) => tracing::error!(
            action,
            admin_id = %admin.id,
            error = %e,
            "Failed to record admin activity"
        ),
    }
}
