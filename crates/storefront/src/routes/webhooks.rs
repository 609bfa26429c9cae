//! Payment processor webhook.
//!
//! The signature covers the raw body, so the handler takes `Bytes` and only
//! parses JSON after verification.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::Result;
use crate::services::orders::OrderService;
use crate::services::payments::{
    PaymentError, SIGNATURE_HEADER, WebhookEvent, verify_webhook_signature,
};
use crate::state::AppState;

#[instrument(skip_all)]
pub async fn payments(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(PaymentError::MalformedSignature)?;

    verify_webhook_signature(
        signature,
        &body,
        state.config().payments.webhook_secret.expose_secret(),
        Utc::now().timestamp(),
    )
    .inspect_err(|e| tracing::warn!(error = %e, "Rejected payment webhook"))?;

    let event = WebhookEvent::parse(&body)?;
    tracing::info!(event_id = %event.id, kind = %event.kind, "Payment webhook received");

    let order_number = OrderService::new(state.pool(), state.payments(), state.notifier())
        .apply_payment_event(event.classify())
        .await?;

    Ok(Json(json!({ "received": true, "order_number": order_number })))
}
