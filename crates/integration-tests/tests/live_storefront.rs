//! HTTP tests against a running storefront.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (cargo run -p malmequer-cli -- migrate all)
//! - The storefront running (cargo run -p malmequer-storefront)
//! - The catalog seeded (cargo run -p malmequer-cli -- seed)
//!
//! Run with: cargo test -p malmequer-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::Value;

use malmequer_integration_tests::{session_client, storefront_base_url};

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_and_readiness() {
    let client = session_client().expect("Failed to create HTTP client");
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("No body"), "ok");

    let resp = client
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_product_listing_is_paginated() {
    let client = session_client().expect("Failed to create HTTP client");
    let resp = client
        .get(format!("{}/api/products?per_page=2", storefront_base_url()))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let page: Value = resp.json().await.expect("Invalid JSON");
    assert!(page["items"].as_array().is_some_and(|items| items.len() <= 2));
    assert_eq!(page["per_page"], 2);
    // Draft products never reach the storefront.
    assert!(
        page["items"]
            .as_array()
            .into_iter()
            .flatten()
            .all(|p| p["slug"] != "chapeu-de-palha")
    );
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_inverted_price_filter_is_rejected() {
    let client = session_client().expect("Failed to create HTTP client");
    let resp = client
        .get(format!(
            "{}/api/products?min_price=50&max_price=10",
            storefront_base_url()
        ))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_guest_starts_with_empty_cart_and_no_account() {
    let client = session_client().expect("Failed to create HTTP client");
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/api/cart"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let cart: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(cart["item_count"], 0);
    assert!(cart["lines"].as_array().is_some_and(Vec::is_empty));

    let resp = client
        .get(format!("{base_url}/api/auth/me"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
