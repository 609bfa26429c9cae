//! Signed payment processor events, from raw body to order action.
//!
//! The `#[ignore]`d test needs a running storefront whose
//! `PAYMENTS_WEBHOOK_SECRET` matches the one exported here.

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use malmequer_integration_tests::storefront_base_url;
use malmequer_storefront::services::payments::{
    PaymentError, PaymentEvent, SIGNATURE_HEADER, SIGNATURE_TOLERANCE_SECS, WebhookEvent,
    sign_payload, verify_webhook_signature,
};

const SECRET: &str = "whsec_integration_secret";

fn event(kind: &str, intent: &str) -> Vec<u8> {
    json!({
        "id": "evt_integration",
        "type": kind,
        "data": { "object": { "id": intent, "metadata": { "order_number": "MQ-20260101-TEST01" } } }
    })
    .to_string()
    .into_bytes()
}

fn signed_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!("t={timestamp},v1={}", sign_payload(secret, timestamp, payload))
}

#[test]
fn test_verified_success_event_marks_intent_paid() {
    let now = Utc::now().timestamp();
    let body = event("payment_intent.succeeded", "pi_live_1");
    let header = signed_header(SECRET, now, &body);

    verify_webhook_signature(&header, &body, SECRET, now).unwrap();
    let parsed = WebhookEvent::parse(&body).unwrap();
    assert_eq!(
        parsed.classify(),
        PaymentEvent::Succeeded {
            payment_intent_id: "pi_live_1".to_string()
        }
    );
}

#[test]
fn test_failure_and_unknown_events() {
    let failed = WebhookEvent::parse(&event("payment_intent.payment_failed", "pi_2")).unwrap();
    assert_eq!(
        failed.classify(),
        PaymentEvent::Failed {
            payment_intent_id: "pi_2".to_string()
        }
    );

    let other = WebhookEvent::parse(&event("charge.dispute.created", "dp_3")).unwrap();
    assert!(matches!(
        other.classify(),
        PaymentEvent::Ignored { kind } if kind == "charge.dispute.created"
    ));
}

#[test]
fn test_replayed_event_outside_tolerance_is_rejected() {
    let signed_at = Utc::now().timestamp() - SIGNATURE_TOLERANCE_SECS - 60;
    let body = event("payment_intent.succeeded", "pi_old");
    let header = signed_header(SECRET, signed_at, &body);
    assert!(matches!(
        verify_webhook_signature(&header, &body, SECRET, Utc::now().timestamp()),
        Err(PaymentError::StaleSignature)
    ));
}

#[test]
fn test_body_changed_after_signing_is_rejected() {
    let now = Utc::now().timestamp();
    let body = event("payment_intent.succeeded", "pi_4");
    let header = signed_header(SECRET, now, &body);
    let forged = event("payment_intent.succeeded", "pi_5");
    assert!(matches!(
        verify_webhook_signature(&header, &forged, SECRET, now),
        Err(PaymentError::InvalidSignature)
    ));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_live_webhook_signature_enforced() {
    let secret = std::env::var("PAYMENTS_WEBHOOK_SECRET").unwrap_or_else(|_| SECRET.to_string());
    let url = format!("{}/api/webhooks/payments", storefront_base_url());
    let client = Client::new();

    let body = event("charge.dispute.created", "dp_live");
    let resp = client
        .post(&url)
        .header("content-type", "application/json")
        .body(body.clone())
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let now = Utc::now().timestamp();
    let resp = client
        .post(&url)
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signed_header(&secret, now, &body))
        .body(body)
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(json["received"], true);
    assert!(json["order_number"].is_null());
}
