//! Authentication extractors and session helpers.
//!
//! Customers are identified by the `CurrentUser` stored in the session.
//! Anonymous shoppers get a guest id the first time they write to a cart or
//! wishlist; it is merged into the account and dropped on login.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{CartOwner, CurrentUser, session_keys};

/// Extractor that requires a logged-in customer.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_addresses(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Addresses for {}", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Rejection when a route needs a customer and the session has none.
#[derive(Debug)]
pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Authentication required" })),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.extensions.get::<Session>().ok_or(AuthRejection)?;
        current_user(session).await.map(Self).ok_or(AuthRejection)
    }
}

/// Extractor that optionally gets the current customer.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session).await,
            None => None,
        };
        Ok(Self(user))
    }
}

/// Whoever is shopping: a logged-in customer or an anonymous session.
///
/// Reads never create a guest id; writes go through [`Shopper::owner_or_create`].
pub struct Shopper {
    session: Session,
    user: Option<CurrentUser>,
}

impl<S> FromRequestParts<S> for Shopper
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;
        let user = current_user(&session).await;
        Ok(Self { session, user })
    }
}

impl Shopper {
    #[must_use]
    pub const fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The current owner, if there is one yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    pub async fn owner(&self) -> Result<Option<CartOwner>, AppError> {
        if let Some(user) = &self.user {
            return Ok(Some(CartOwner::User(user.id)));
        }
        Ok(guest_id(&self.session).await?.map(CartOwner::Guest))
    }

    /// The current owner, minting a guest id for anonymous sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    pub async fn owner_or_create(&self) -> Result<CartOwner, AppError> {
        if let Some(owner) = self.owner().await? {
            return Ok(owner);
        }
        let id = Uuid::new_v4();
        self.session.insert(session_keys::GUEST_ID, id).await?;
        tracing::debug!(guest_id = %id, "Started guest session");
        Ok(CartOwner::Guest(id))
    }
}

async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Read the guest id without creating one.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn guest_id(session: &Session) -> Result<Option<Uuid>, tower_sessions::session::Error> {
    session.get::<Uuid>(session_keys::GUEST_ID).await
}

/// Remove and return the guest id, e.g. after merging it into an account.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn take_guest_id(
    session: &Session,
) -> Result<Option<Uuid>, tower_sessions::session::Error> {
    session.remove::<Uuid>(session_keys::GUEST_ID).await
}

/// Store the logged-in customer, rotating the session id first.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Clear the whole session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;
    use malmequer_core::{Email, UserId};

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn customer() -> CurrentUser {
        CurrentUser {
            id: UserId::new(7),
            email: Email::parse("ana@example.com").unwrap(),
            name: Some("Ana".to_string()),
        }
    }

    #[tokio::test]
    async fn test_guest_owner_created_once() {
        let shopper = Shopper { session: session(), user: None };
        assert_eq!(shopper.owner().await.unwrap(), None);

        let first = shopper.owner_or_create().await.unwrap();
        let second = shopper.owner_or_create().await.unwrap();
        assert!(matches!(first, CartOwner::Guest(_)));
        assert_eq!(first, second);
        assert_eq!(shopper.owner().await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_user_owner_wins_over_guest() {
        let session = session();
        session.insert(session_keys::GUEST_ID, Uuid::new_v4()).await.unwrap();
        let shopper = Shopper { session, user: Some(customer()) };
        assert_eq!(
            shopper.owner_or_create().await.unwrap(),
            CartOwner::User(UserId::new(7))
        );
    }

    #[tokio::test]
    async fn test_login_then_logout() {
        let session = session();
        let guest = Uuid::new_v4();
        session.insert(session_keys::GUEST_ID, guest).await.unwrap();

        set_current_user(&session, &customer()).await.unwrap();
        assert_eq!(current_user(&session).await.unwrap().id, UserId::new(7));
        assert_eq!(take_guest_id(&session).await.unwrap(), Some(guest));
        assert_eq!(guest_id(&session).await.unwrap(), None);

        clear_current_user(&session).await.unwrap();
        assert!(current_user(&session).await.is_none());
    }
}
