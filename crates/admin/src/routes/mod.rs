//! HTTP route handlers for the back-office JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                  - Liveness
//! GET    /health/ready                            - Readiness (database ping)
//!
//! # Auth
//! POST   /api/auth/login                          - Log in (rate limited)
//! POST   /api/auth/logout                         - Log out
//! GET    /api/auth/me                             - Current admin
//!
//! # Catalog (writes need admin or super_admin)
//! GET    /api/products                            - Product table (all statuses)
//! POST   /api/products                            - Create product
//! GET    /api/products/low-stock                  - Stock items at or below threshold
//! GET    /api/products/{id}                       - Product with variants and stock
//! PUT    /api/products/{id}                       - Update product
//! DELETE /api/products/{id}                       - Delete (archive when ordered)
//! PUT    /api/products/{id}/variants              - Replace sizes and colors
//! PUT    /api/products/{id}/stock                 - Set stock grid
//! PATCH  /api/products/{id}/stock/{stock_item_id} - Adjust one stock item
//! GET    /api/categories                          - Categories with product counts
//! POST   /api/categories                          - Create category
//! PUT    /api/categories/{id}                     - Update category
//! DELETE /api/categories/{id}                     - Delete unused category
//!
//! # Orders
//! GET    /api/orders                              - Order table with filters
//! GET    /api/orders/{number}                     - Order with items
//! PATCH  /api/orders/{number}/status              - Change status
//! POST   /api/orders/{number}/payment             - Accept payment manually
//!
//! # Insight
//! GET    /api/dashboard                           - Headline numbers
//! GET    /api/reports/{kind}                      - Report as JSON or CSV
//! GET    /api/activity                            - Activity log
//!
//! # Accounts (super_admin)
//! GET    /api/admins                              - Admin accounts
//! POST   /api/admins                              - Create admin account
//! ```

pub mod activity;
pub mod admin_users;
pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod health;
pub mod orders;
pub mod products;
pub mod reports;

use axum::{
    Router,
    extract::Request,
    middleware::from_fn,
    routing::{get, patch, post, put},
};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    auth_rate_limiter, create_session_layer, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Login sits behind the strict rate limiter.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter());

    Router::new()
        .merge(limited)
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index).post(products::create))
        .route("/products/low-stock", get(products::low_stock))
        .route(
            "/products/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/products/{id}/variants", put(products::replace_variants))
        .route("/products/{id}/stock", put(products::set_stock))
        .route(
            "/products/{id}/stock/{stock_item_id}",
            patch(products::adjust_stock),
        )
        .route(
            "/categories",
            get(categories::index).post(categories::create),
        )
        .route(
            "/categories/{id}",
            put(categories::update).delete(categories::delete),
        )
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::index))
        .route("/orders/{number}", get(orders::show))
        .route("/orders/{number}/status", patch(orders::update_status))
        .route("/orders/{number}/payment", post(orders::accept_payment))
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .merge(catalog_routes())
        .merge(order_routes())
        .route("/dashboard", get(dashboard::stats))
        .route("/reports/{kind}", get(reports::generate))
        .route("/activity", get(activity::index))
        .route(
            "/admins",
            get(admin_users::index).post(admin_users::create),
        )
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .nest("/api", api_routes())
}

/// The full application: routes plus session, security, request id and
/// tracing layers. Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());

    routes()
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
