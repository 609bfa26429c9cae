//! Admin activity log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use malmequer_core::{ActivityLogId, AdminUserId};

/// Default number of entries returned by the log listing.
pub const DEFAULT_LIMIT: i64 = 50;
/// Largest listing a client may request.
pub const MAX_LIMIT: i64 = 500;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActivityEntry {
    pub id: ActivityLogId,
    pub admin_user_id: Option<AdminUserId>,
    /// Name of the admin at read time; `None` once the admin is deleted.
    pub admin_name: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

/// An entry about to be appended.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub admin_user_id: Option<AdminUserId>,
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: Option<String>,
    pub details: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActivityQuery {
    pub action: Option<String>,
    pub limit: Option<i64>,
}

impl ActivityQuery {
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }
}

/// Action names written to the log.
pub mod actions {
    pub const LOGIN: &str = "admin.login";
    pub const ADMIN_CREATE: &str = "admin.create";
    pub const PRODUCT_CREATE: &str = "product.create";
    pub const PRODUCT_UPDATE: &str = "product.update";
    pub const PRODUCT_DELETE: &str = "product.delete";
    pub const PRODUCT_ARCHIVE: &str = "product.archive";
    pub const VARIANTS_REPLACE: &str = "product.variants";
    pub const STOCK_SET: &str = "stock.set";
    pub const STOCK_ADJUST: &str = "stock.adjust";
    pub const CATEGORY_CREATE: &str = "category.create";
    pub const CATEGORY_UPDATE: &str = "category.update";
    pub const CATEGORY_DELETE: &str = "category.delete";
    pub const ORDER_STATUS: &str = "order.status";
    pub const PAYMENT_MANUAL_ACCEPT: &str = "payment.manual_accept";
    pub const REPORT_GENERATE: &str = "report.generate";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(ActivityQuery::default().limit(), DEFAULT_LIMIT);
        let huge = ActivityQuery { action: None, limit: Some(10_000) };
        assert_eq!(huge.limit(), MAX_LIMIT);
        let zero = ActivityQuery { action: None, limit: Some(0) };
        assert_eq!(zero.limit(), 1);
    }

    #[test]
    fn test_blank_action_is_ignored() {
        let query = ActivityQuery { action: Some("  ".into()), limit: None };
        assert_eq!(query.action(), None);
    }
}
