//! HTTP route handlers for the storefront JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                           - Liveness
//! GET    /health/ready                     - Readiness (database ping)
//!
//! # Catalog
//! GET    /api/products                     - Product listing (filters, sort, pages)
//! GET    /api/products/{slug}              - Product detail
//! GET    /api/products/{slug}/reviews      - Reviews, newest first
//! POST   /api/products/{slug}/reviews      - Post a review (auth)
//! GET    /api/categories                   - Categories with product counts
//! GET    /api/categories/{slug}            - Category with its products
//! GET    /api/search?q=                    - Product search (cached)
//! GET    /api/recommendations?type=        - Popular / trending / bought together
//!
//! # Cart and checkout (users and guests)
//! GET    /api/cart                         - Current cart
//! DELETE /api/cart                         - Clear cart
//! POST   /api/cart/items                   - Add to cart
//! PATCH  /api/cart/items/{id}              - Set quantity (0 removes)
//! DELETE /api/cart/items/{id}              - Remove line
//! POST   /api/checkout                     - Place order, start payment
//! GET    /api/wishlist                     - Wishlist
//! POST   /api/wishlist                     - Add to wishlist
//! DELETE /api/wishlist/{product_id}        - Remove from wishlist
//!
//! # Orders
//! GET    /api/orders                       - Order history (auth)
//! GET    /api/orders/{number}?email=       - Order detail (owner or guest email)
//! POST   /api/orders/{number}/cancel       - Cancel (auth)
//!
//! # Auth and account
//! POST   /api/auth/register                - Register and log in
//! POST   /api/auth/login                   - Log in
//! POST   /api/auth/logout                  - Log out
//! GET    /api/auth/me                      - Current customer
//! GET    /api/account/addresses            - Saved addresses
//! POST   /api/account/addresses            - Add address
//! PUT    /api/account/addresses/{id}       - Update address
//! DELETE /api/account/addresses/{id}       - Delete address
//! GET    /api/account/notifications        - Notification settings
//! PUT    /api/account/notifications        - Update notification settings
//!
//! # Payment processor
//! POST   /api/webhooks/payments            - Signed payment events
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod products;
pub mod recommendations;
pub mod reviews;
pub mod search;
pub mod webhooks;
pub mod wishlist;

use axum::{
    Router,
    extract::Request,
    middleware::from_fn,
    routing::{get, patch, post, put},
};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, create_session_layer, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Login and registration, behind the strict rate limiter.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter());

    Router::new()
        .merge(limited)
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{slug}", get(products::show))
        .route(
            "/products/{slug}/reviews",
            get(reviews::index).post(reviews::create),
        )
        .route("/categories", get(categories::index))
        .route("/categories/{slug}", get(categories::show))
        .route("/search", get(search::search))
        .route("/recommendations", get(recommendations::recommendations))
}

pub fn shopping_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show).delete(cart::clear))
        .route("/cart/items", post(cart::add))
        .route(
            "/cart/items/{id}",
            patch(cart::update).delete(cart::remove),
        )
        .route("/checkout", post(checkout::checkout))
        .route("/wishlist", get(wishlist::index).post(wishlist::add))
        .route(
            "/wishlist/{product_id}",
            axum::routing::delete(wishlist::remove),
        )
        .route("/orders", get(orders::index))
        .route("/orders/{number}", get(orders::show))
        .route("/orders/{number}/cancel", post(orders::cancel))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route(
            "/addresses/{id}",
            put(account::update_address).delete(account::delete_address),
        )
        .route(
            "/notifications",
            get(account::notification_settings).put(account::update_notification_settings),
        )
}

/// All `/api` routes. The webhook sits outside the per-IP limiter.
pub fn api_routes() -> Router<AppState> {
    let limited = Router::new()
        .merge(catalog_routes())
        .merge(shopping_routes())
        .nest("/account", account_routes())
        .layer(api_rate_limiter());

    Router::new()
        .merge(limited)
        .nest("/auth", auth_routes())
        .route("/webhooks/payments", post(webhooks::payments))
}

/// Create all routes for the storefront.
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
