//! Session-related types.
//!
//! Types stored in the session for authentication and guest state.

use serde::{Deserialize, Serialize};

use malmequer_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name, if the customer gave one.
    pub name: Option<String>,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the anonymous cart/wishlist owner id.
    pub const GUEST_ID: &str = "guest_id";
}
