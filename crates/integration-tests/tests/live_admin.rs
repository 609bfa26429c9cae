//! HTTP tests against a running back office.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (cargo run -p malmequer-cli -- migrate all)
//! - The admin server running (cargo run -p malmequer-admin)
//! - An admin account whose credentials are in `ADMIN_TEST_EMAIL` and
//!   `ADMIN_TEST_PASSWORD` (cargo run -p malmequer-cli -- admin create ...)
//!
//! Run with: cargo test -p malmequer-integration-tests -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use malmequer_integration_tests::{admin_base_url, session_client};

/// Log in with the test account and keep the session cookie.
async fn authenticated_client() -> Client {
    let email = std::env::var("ADMIN_TEST_EMAIL").expect("ADMIN_TEST_EMAIL not set");
    let password = std::env::var("ADMIN_TEST_PASSWORD").expect("ADMIN_TEST_PASSWORD not set");

    let client = session_client().expect("Failed to create HTTP client");
    let resp = client
        .post(format!("{}/api/auth/login", admin_base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Login request failed");
    assert_eq!(resp.status(), StatusCode::OK, "login failed");
    client
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_api_requires_login() {
    let client = session_client().expect("Failed to create HTTP client");
    let base_url = admin_base_url();

    for path in ["/api/products", "/api/orders", "/api/reports/sales", "/api/dashboard"] {
        let resp = client
            .get(format!("{base_url}{path}"))
            .send()
            .await
            .expect("Request failed");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_wrong_password_is_rejected() {
    let client = session_client().expect("Failed to create HTTP client");
    let resp = client
        .post(format!("{}/api/auth/login", admin_base_url()))
        .json(&json!({ "email": "nobody@malmequer.pt", "password": "not-the-password" }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_login_me_logout() {
    let client = authenticated_client().await;
    let base_url = admin_base_url();

    let resp = client
        .get(format!("{base_url}/api/auth/me"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let me: Value = resp.json().await.expect("Invalid JSON");
    assert!(me["role"].is_string());

    let resp = client
        .post(format!("{base_url}/api/auth/logout"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(format!("{base_url}/api/auth/me"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_reports() {
    let client = authenticated_client().await;
    let base_url = admin_base_url();

    let resp = client
        .get(format!("{base_url}/api/reports/sales?from=2026-01-01&to=2026-01-31"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let report: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(report["kind"], "sales");
    assert_eq!(report["revenue_by_day"].as_array().map(Vec::len), Some(31));

    let resp = client
        .get(format!(
            "{base_url}/api/reports/financial?from=2026-01-01&to=2026-01-31&format=csv"
        ))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"].to_str().expect("Header not ASCII"),
        "text/csv; charset=utf-8"
    );
    let csv = resp.text().await.expect("No body");
    assert!(csv.starts_with("metric,amount\n"));

    let resp = client
        .get(format!("{base_url}/api/reports/sales?from=2026-02-01&to=2026-01-01"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .get(format!("{base_url}/api/reports/weather"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_category_in_use_cannot_be_deleted() {
    let client = authenticated_client().await;
    let base_url = admin_base_url();

    let resp = client
        .get(format!("{base_url}/api/categories"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let categories: Value = resp.json().await.expect("Invalid JSON");
    let shirts = categories
        .as_array()
        .into_iter()
        .flatten()
        .find(|c| c["slug"] == "camisas")
        .expect("seeded category camisas");
    assert!(shirts["product_count"].as_i64().is_some_and(|n| n > 0));

    let resp = client
        .delete(format!("{base_url}/api/categories/{}", shirts["id"]))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // An unused category goes away.
    let name = format!("Temporaria {}", chrono::Utc::now().timestamp_millis());
    let resp = client
        .post(format!("{base_url}/api/categories"))
        .json(&json!({ "name": name }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await.expect("Invalid JSON");

    let resp = client
        .delete(format!("{base_url}/api/categories/{}", created["id"]))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}
