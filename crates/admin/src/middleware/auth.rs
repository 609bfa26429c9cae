//! Authentication extractors for admin.
//!
//! Every back-office route needs a logged-in admin. Reads are open to all
//! roles, writes need [`RequireWriteAccess`] and admin account management
//! needs [`RequireSuperAdmin`].

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::models::{AdminRole, CurrentAdmin, session_keys};

/// Rejection for admin-only routes.
#[derive(Debug, PartialEq, Eq)]
pub enum AdminAuthRejection {
    /// No admin in the session.
    Unauthorized,
    /// Logged in, but the role does not allow this.
    Forbidden(&'static str),
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Authentication required" })),
            )
                .into_response(),
            Self::Forbidden(message) => {
                (StatusCode::FORBIDDEN, Json(json!({ "error": message }))).into_response()
            }
        }
    }
}

/// Extractor that requires admin authentication.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdminAuth(admin): RequireAdminAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", admin.name)
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

impl<S> FromRequestParts<S> for RequireAdminAuth
where
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        admin_from_parts(parts).await.map(Self)
    }
}

/// Extractor for routes that change data: `admin` or `super_admin`.
pub struct RequireWriteAccess(pub CurrentAdmin);

impl<S> FromRequestParts<S> for RequireWriteAccess
where
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = admin_from_parts(parts).await?;
        check_write(&admin)?;
        Ok(Self(admin))
    }
}

/// Extractor that requires the `super_admin` role.
pub struct RequireSuperAdmin(pub CurrentAdmin);

impl<S> FromRequestParts<S> for RequireSuperAdmin
where
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = admin_from_parts(parts).await?;
        check_super_admin(&admin)?;
        Ok(Self(admin))
    }
}

fn check_write(admin: &CurrentAdmin) -> Result<(), AdminAuthRejection> {
    if admin.can_write() {
        Ok(())
    } else {
        Err(AdminAuthRejection::Forbidden("Read-only accounts cannot make changes"))
    }
}

fn check_super_admin(admin: &CurrentAdmin) -> Result<(), AdminAuthRejection> {
    if admin.role == AdminRole::SuperAdmin {
        Ok(())
    } else {
        Err(AdminAuthRejection::Forbidden("Only super admins can access this resource"))
    }
}

async fn admin_from_parts(parts: &Parts) -> Result<CurrentAdmin, AdminAuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AdminAuthRejection::Unauthorized)?;
    current_admin(session)
        .await
        .ok_or(AdminAuthRejection::Unauthorized)
}

/// The admin stored in the session, if any.
pub async fn current_admin(session: &Session) -> Option<CurrentAdmin> {
    session
        .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await
        .ok()
        .flatten()
}

/// Store the logged-in admin, rotating the session id first.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Clear the whole session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request;
    use tower_sessions::MemoryStore;

    use super::*;
    use malmequer_core::{AdminUserId, Email};

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn admin(role: AdminRole) -> CurrentAdmin {
        CurrentAdmin {
            id: AdminUserId::new(1),
            email: Email::parse("ops@malmequer.pt").unwrap(),
            name: "Ops".to_string(),
            role,
        }
    }

    fn parts_with(session: Option<Session>) -> Parts {
        let mut request = Request::builder().uri("/api/products").body(()).unwrap();
        if let Some(session) = session {
            request.extensions_mut().insert(session);
        }
        request.into_parts().0
    }

    #[tokio::test]
    async fn test_set_and_clear_current_admin() {
        let session = session();
        assert!(current_admin(&session).await.is_none());

        set_current_admin(&session, &admin(AdminRole::Admin)).await.unwrap();
        assert_eq!(current_admin(&session).await, Some(admin(AdminRole::Admin)));

        clear_current_admin(&session).await.unwrap();
        assert!(current_admin(&session).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_session_is_unauthorized() {
        let mut parts = parts_with(None);
        let result = RequireAdminAuth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AdminAuthRejection::Unauthorized)));
    }

    #[tokio::test]
    async fn test_viewer_can_read_but_not_write() {
        let session = session();
        set_current_admin(&session, &admin(AdminRole::Viewer)).await.unwrap();

        let mut parts = parts_with(Some(session.clone()));
        assert!(RequireAdminAuth::from_request_parts(&mut parts, &()).await.is_ok());

        let mut parts = parts_with(Some(session));
        let result = RequireWriteAccess::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AdminAuthRejection::Forbidden(_))));
    }

    #[test]
    fn test_role_checks() {
        assert!(check_write(&admin(AdminRole::Admin)).is_ok());
        assert!(check_write(&admin(AdminRole::SuperAdmin)).is_ok());
        assert!(check_super_admin(&admin(AdminRole::Admin)).is_err());
        assert!(check_super_admin(&admin(AdminRole::SuperAdmin)).is_ok());
    }

    #[test]
    fn test_rejection_status_codes() {
        assert_eq!(
            AdminAuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AdminAuthRejection::Forbidden("no").into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
