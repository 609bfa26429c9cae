//! Integration tests for Malmequer.
//!
//! # Running Tests
//!
//! ```bash
//! # Business rules across crates, no services needed
//! cargo test -p malmequer-integration-tests
//!
//! # Live HTTP tests against running servers
//! cargo run -p malmequer-cli -- migrate all
//! cargo run -p malmequer-storefront &
//! cargo run -p malmequer-admin &
//! cargo test -p malmequer-integration-tests -- --ignored
//! ```
//!
//! # Test Files
//!
//! - `checkout_rules` - cart merging, totals and order numbers
//! - `order_lifecycle` - status table, payments and customer email
//! - `payment_webhooks` - signed processor events
//! - `live_storefront` / `live_admin` - HTTP against running servers
//! - `live_shopping` - cart, checkout, cancel and guest merge flows

use std::str::FromStr;

use chrono::Utc;
use rand::Rng;
use reqwest::Client;
use rust_decimal::Decimal;

/// Base URL for the storefront API (configurable via environment).
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Base URL for the admin API (configurable via environment).
#[must_use]
pub fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// Client that keeps the session cookie between requests.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn session_client() -> reqwest::Result<Client> {
    Client::builder().cookie_store(true).build()
}

/// Fresh address for a throwaway customer account.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    let nonce: u32 = rand::rng().random();
    format!("{prefix}-{}-{nonce:08x}@test.malmequer.pt", Utc::now().timestamp())
}

/// Parse a decimal literal used in fixtures.
///
/// # Panics
///
/// Panics on a malformed literal.
#[must_use]
pub fn money(amount: &str) -> Decimal {
    #[allow(clippy::unwrap_used)]
    Decimal::from_str(amount).unwrap()
}
