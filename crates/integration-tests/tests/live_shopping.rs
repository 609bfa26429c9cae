//! Shopping flows against a running storefront: stock limits in the cart,
//! stock reserved at checkout and released on cancel, guest data adopted
//! at registration and login.
//!
//! These tests require the same setup as `live_storefront` plus a seeded
//! catalog (cargo run -p malmequer-cli -- seed). Checkout answers 502 when
//! no payment processor is reachable; the order is placed either way.
//!
//! Run with: cargo test -p malmequer-integration-tests -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use malmequer_integration_tests::{session_client, storefront_base_url, unique_email};

const PASSWORD: &str = "malmequer-test-1";

fn shipping_address() -> Value {
    json!({
        "full_name": "Inês Teste",
        "line1": "Rua das Flores 12",
        "city": "Porto",
        "postal_code": "4050-262",
        "country": "PT"
    })
}

async fn product(client: &Client, slug: &str) -> Value {
    let resp = client
        .get(format!("{}/api/products/{slug}", storefront_base_url()))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK, "{slug}");
    resp.json().await.expect("Invalid JSON")
}

/// `(product_id, stock_item_id, quantity)` of the first variant with stock.
async fn variant_in_stock(client: &Client, slug: &str) -> (i64, i64, i64) {
    let detail = product(client, slug).await;
    let item = detail["stock_items"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|item| item["quantity"].as_i64().is_some_and(|q| q > 0))
        .unwrap_or_else(|| panic!("{slug} has no variant in stock"));
    (
        detail["id"].as_i64().expect("product id"),
        item["id"].as_i64().expect("stock item id"),
        item["quantity"].as_i64().expect("quantity"),
    )
}

async fn stock_of(client: &Client, slug: &str, stock_item_id: i64) -> i64 {
    let detail = product(client, slug).await;
    detail["stock_items"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|item| item["id"].as_i64() == Some(stock_item_id))
        .and_then(|item| item["quantity"].as_i64())
        .expect("stock item missing")
}

async fn add_to_cart(
    client: &Client,
    product_id: i64,
    stock_item_id: i64,
    quantity: i64,
) -> reqwest::Response {
    client
        .post(format!("{}/api/cart/items", storefront_base_url()))
        .json(&json!({
            "product_id": product_id,
            "stock_item_id": stock_item_id,
            "quantity": quantity,
        }))
        .send()
        .await
        .expect("Request failed")
}

async fn cart(client: &Client) -> Value {
    let resp = client
        .get(format!("{}/api/cart", storefront_base_url()))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.expect("Invalid JSON")
}

async fn register(client: &Client, email: &str) {
    let resp = client
        .post(format!("{}/api/auth/register", storefront_base_url()))
        .json(&json!({ "email": email, "password": PASSWORD, "name": "Cliente Teste" }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::CREATED);
}

async fn checkout(client: &Client, email: Option<&str>) -> reqwest::Response {
    client
        .post(format!("{}/api/checkout", storefront_base_url()))
        .json(&json!({ "shipping_address": shipping_address(), "email": email }))
        .send()
        .await
        .expect("Request failed")
}

fn assert_order_placed(status: StatusCode) {
    assert!(
        status == StatusCode::CREATED || status == StatusCode::BAD_GATEWAY,
        "checkout answered {status}"
    );
}

/// Newest order of the logged-in customer.
async fn latest_order(client: &Client) -> Value {
    let resp = client
        .get(format!("{}/api/orders", storefront_base_url()))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let orders: Value = resp.json().await.expect("Invalid JSON");
    orders[0].clone()
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_cart_refuses_more_than_stock() {
    let client = session_client().expect("Failed to create HTTP client");
    let (product_id, stock_item_id, available) = variant_in_stock(&client, "camisa-oxford").await;

    let resp = add_to_cart(&client, product_id, stock_item_id, available + 1).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["available"], available);

    // What is already in the cart counts against the same limit.
    let resp = add_to_cart(&client, product_id, stock_item_id, available).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = add_to_cart(&client, product_id, stock_item_id, 1).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let cart = cart(&client).await;
    assert_eq!(cart["item_count"], available);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_checkout_reserves_stock_and_cancel_restores_it() {
    let client = session_client().expect("Failed to create HTTP client");
    register(&client, &unique_email("checkout")).await;

    let (product_id, stock_item_id, before) = variant_in_stock(&client, "saco-de-pano").await;
    let resp = add_to_cart(&client, product_id, stock_item_id, 1).await;
    assert_eq!(resp.status(), StatusCode::OK);

    assert_order_placed(checkout(&client, None).await.status());
    assert_eq!(stock_of(&client, "saco-de-pano", stock_item_id).await, before - 1);
    assert_eq!(cart(&client).await["item_count"], 0);

    let order = latest_order(&client).await;
    assert_eq!(order["status"], "PENDING");
    let number = order["order_number"].as_str().expect("order number");

    let resp = client
        .post(format!("{}/api/orders/{number}/cancel", storefront_base_url()))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let cancelled: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(cancelled["status"], "CANCELLED");
    assert_eq!(stock_of(&client, "saco-de-pano", stock_item_id).await, before);

    // Cancelled is final.
    let resp = client
        .post(format!("{}/api/orders/{number}/cancel", storefront_base_url()))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_last_units_go_to_the_first_checkout() {
    let buyer = session_client().expect("Failed to create HTTP client");
    let guest = session_client().expect("Failed to create HTTP client");
    register(&buyer, &unique_email("first")).await;

    let (product_id, stock_item_id, available) =
        variant_in_stock(&buyer, "vestido-malmequer").await;
    // Both carts hold every unit left; carts do not reserve stock.
    for client in [&buyer, &guest] {
        let resp = add_to_cart(client, product_id, stock_item_id, available).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    assert_order_placed(checkout(&buyer, None).await.status());
    assert_eq!(stock_of(&buyer, "vestido-malmequer", stock_item_id).await, 0);

    let guest_email = unique_email("second");
    let resp = checkout(&guest, Some(&guest_email)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["available"], 0);
    // The refused checkout left the guest's cart alone.
    assert_eq!(cart(&guest).await["item_count"], available);

    let number = latest_order(&buyer).await["order_number"]
        .as_str()
        .expect("order number")
        .to_string();
    let resp = buyer
        .post(format!("{}/api/orders/{number}/cancel", storefront_base_url()))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(stock_of(&buyer, "vestido-malmequer", stock_item_id).await, available);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_guest_cart_and_wishlist_follow_the_customer() {
    let client = session_client().expect("Failed to create HTTP client");
    let base_url = storefront_base_url();
    let email = unique_email("merge");

    let (product_id, stock_item_id, available) =
        variant_in_stock(&client, "camisa-de-linho").await;
    assert!(available >= 2, "camisa-de-linho needs two units in stock");
    let resp = add_to_cart(&client, product_id, stock_item_id, 1).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Adding the same product twice is answered, not duplicated.
    for expected in [StatusCode::CREATED, StatusCode::OK] {
        let resp = client
            .post(format!("{base_url}/api/wishlist"))
            .json(&json!({ "product_id": product_id }))
            .send()
            .await
            .expect("Request failed");
        assert_eq!(resp.status(), expected);
        let wishlist: Value = resp.json().await.expect("Invalid JSON");
        assert_eq!(wishlist.as_array().map(Vec::len), Some(1));
    }

    register(&client, &email).await;
    let merged = cart(&client).await;
    assert_eq!(merged["item_count"], 1);
    let wishlist: Value = client
        .get(format!("{base_url}/api/wishlist"))
        .send()
        .await
        .expect("Request failed")
        .json()
        .await
        .expect("Invalid JSON");
    assert_eq!(wishlist.as_array().map(Vec::len), Some(1));

    // A second guest visit on the same line adds up at login.
    let resp = client
        .post(format!("{base_url}/api/auth/logout"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(cart(&client).await["item_count"], 0);
    let resp = add_to_cart(&client, product_id, stock_item_id, 1).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{base_url}/api/auth/login"))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let merged = cart(&client).await;
    assert_eq!(merged["item_count"], 2);
    assert_eq!(merged["lines"].as_array().map(Vec::len), Some(1));
}
