//! Business logic services for admin.
//!
//! # Services
//!
//! - `activity` - Append-only audit trail of admin actions
//! - `auth` - Password login and admin account creation
//! - `orders` - Order status changes and manual payment
//! - `reports` - Sales, inventory, customer and financial reports

pub mod activity;
pub mod auth;
pub mod orders;
pub mod reports;

pub use auth::{AdminAuthService, AuthError};
pub use orders::{AdminOrderService, OrderAdminError};
pub use reports::{Report, ReportFormat, ReportKind, ReportService};
