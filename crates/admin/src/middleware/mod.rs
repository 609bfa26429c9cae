//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID
//! 4. Security headers
//! 5. Session layer (`admin.session`, `SameSite=Strict`)
//! 6. Rate limiting on login
//!
//! Request id, security headers and the rate limiter are shared with the
//! storefront.

pub mod auth;
pub mod session;

pub use auth::{
    AdminAuthRejection, RequireAdminAuth, RequireSuperAdmin, RequireWriteAccess,
    clear_current_admin, set_current_admin,
};
pub use malmequer_storefront::middleware::{
    auth_rate_limiter, request_id_middleware, security_headers_middleware,
};
pub use session::create_session_layer;
