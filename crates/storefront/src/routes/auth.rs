//! Customer authentication route handlers.
//!
//! Registration and login both adopt the session's guest cart and wishlist.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use malmequer_core::UserId;

use crate::db::WishlistRepository;
use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{
    RequireAuth, clear_current_user, guest_id, set_current_user, take_guest_id,
};
use crate::models::{CurrentUser, User};
use crate::services::auth::AuthService;
use crate::services::cart::CartService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    #[serde(flatten)]
    pub user: User,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Move guest cart lines and wishlist items onto the user.
///
/// A failed merge is logged and the guest id kept, so the next login retries.
async fn adopt_guest_data(state: &AppState, session: &Session, user_id: UserId) -> Result<()> {
    let Some(guest) = guest_id(session).await? else {
        return Ok(());
    };

    let cart = CartService::new(state.pool(), state.cache(), state.config().shop.currency)
        .merge_guest(guest, user_id)
        .await;
    let wishlist = WishlistRepository::new(state.pool())
        .merge_guest(guest, user_id)
        .await;

    match (cart, wishlist) {
        (Ok(()), Ok(moved)) => {
            tracing::info!(%user_id, wishlist_items = moved, "Adopted guest session data");
            take_guest_id(session).await?;
        }
        (cart, wishlist) => {
            tracing::warn!(
                %user_id,
                cart_error = ?cart.err(),
                wishlist_error = ?wishlist.err(),
                "Failed to merge guest session data"
            );
        }
    }
    Ok(())
}

/// Put the user in the session after adopting guest data.
async fn start_session(state: &AppState, session: &Session, user: &User) -> Result<()> {
    adopt_guest_data(state, session, user.id).await?;
    set_current_user(
        session,
        &CurrentUser {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        },
    )
    .await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an account and log it in.
#[instrument(skip(state, session, request))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let name = request.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let user = AuthService::new(state.pool())
        .register(&request.email, &request.password, name)
        .await?;
    tracing::info!(user_id = %user.id, email = %user.email.masked(), "Customer registered");

    start_session(&state, &session, &user).await?;
    state.notifier().welcome(&user).await;
    add_breadcrumb("auth", "Registered", None);

    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

#[instrument(skip(state, session, request))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<UserResponse>> {
    let user = AuthService::new(state.pool())
        .login(&request.email, &request.password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Login failed"))?;

    start_session(&state, &session, &user).await?;
    add_breadcrumb("auth", "Logged in", None);

    Ok(Json(UserResponse { user }))
}

#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in customer's profile.
#[instrument(skip(state, current), fields(user_id = %current.id))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<UserResponse>> {
    let user = AuthService::new(state.pool()).get_user(current.id).await?;
    Ok(Json(UserResponse { user }))
}
