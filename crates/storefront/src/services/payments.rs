//! Payment processor client and webhook verification.
//!
//! The processor speaks form-encoded REST with a bearer secret key. Webhooks
//! carry a `Payment-Signature: t=<unix>,v1=<hex>` header where the signature
//! is HMAC-SHA256 over `"{t}.{payload}"`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::instrument;

use malmequer_core::CurrencyCode;

use crate::config::PaymentsConfig;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "Payment-Signature";

/// Maximum age of a signed webhook, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payment processor returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("amount cannot be charged")]
    InvalidAmount,

    #[error("missing or malformed signature header")]
    MalformedSignature,

    #[error("signature does not match")]
    InvalidSignature,

    #[error("signature timestamp outside tolerance")]
    StaleSignature,

    #[error("invalid webhook payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// A created payment intent.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Refund {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Client for the payment processor.
#[derive(Clone)]
pub struct PaymentClient {
    inner: Arc<PaymentClientInner>,
}

struct PaymentClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
}

impl PaymentClient {
    /// # Errors
    ///
    /// Returns `PaymentError::Http` if the HTTP client cannot be built.
    pub fn new(config: &PaymentsConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            inner: Arc::new(PaymentClientInner {
                client,
                api_base: config.api_base.clone(),
                secret_key: config.secret_key.clone(),
            }),
        })
    }

    /// Create a payment intent for an order.
    ///
    /// The order number doubles as the idempotency key.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Api` if the processor rejects the request.
    #[instrument(skip(self))]
    pub async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: CurrencyCode,
        order_number: &str,
        email: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        if amount_minor <= 0 {
            return Err(PaymentError::InvalidAmount);
        }
        let amount = amount_minor.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency.processor_code()),
            ("receipt_email", email),
            ("metadata[order_number]", order_number),
            ("automatic_payment_methods[enabled]", "true"),
        ];
        self.post("payment_intents", &form, Some(order_number)).await
    }

    /// Refund a payment intent in full.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Api` if the processor rejects the request.
    #[instrument(skip(self))]
    pub async fn refund(&self, payment_intent_id: &str) -> Result<Refund, PaymentError> {
        let idempotency_key = format!("refund-{payment_intent_id}");
        self.post(
            "refunds",
            &[("payment_intent", payment_intent_id)],
            Some(&idempotency_key),
        )
        .await
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
        idempotency_key: Option<&str>,
    ) -> Result<T, PaymentError> {
        let url = format!("{}/{path}", self.inner.api_base);
        let mut request = self
            .inner
            .client
            .post(&url)
            .bearer_auth(self.inner.secret_key.expose_secret())
            .form(form);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                });
            tracing::warn!(status = status.as_u16(), %message, path, "Payment API error");
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

// =============================================================================
// Webhooks
// =============================================================================

/// An event delivered to the webhook endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub object: WebhookObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookObject {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// What a webhook event means for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    Succeeded { payment_intent_id: String },
    Failed { payment_intent_id: String },
    Ignored { kind: String },
}

impl WebhookEvent {
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidPayload` if the body is not an event.
    pub fn parse(payload: &[u8]) -> Result<Self, PaymentError> {
        Ok(serde_json::from_slice(payload)?)
    }

    #[must_use]
    pub fn classify(self) -> PaymentEvent {
        match self.kind.as_str() {
            "payment_intent.succeeded" => PaymentEvent::Succeeded {
                payment_intent_id: self.data.object.id,
            },
            "payment_intent.payment_failed" => PaymentEvent::Failed {
                payment_intent_id: self.data.object.id,
            },
            _ => PaymentEvent::Ignored { kind: self.kind },
        }
    }
}

/// Sign a payload the way the processor does. Used to build test fixtures.
#[must_use]
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a webhook signature header against the raw request body.
///
/// # Errors
///
/// Returns `PaymentError::MalformedSignature` if the header cannot be parsed,
/// `PaymentError::StaleSignature` if the timestamp is outside the tolerance,
/// and `PaymentError::InvalidSignature` if no `v1` signature matches.
pub fn verify_webhook_signature(
    header: &str,
    payload: &[u8],
    secret: &str,
    now: i64,
) -> Result<(), PaymentError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse().map_err(|_| PaymentError::MalformedSignature)?);
            }
            Some(("v1", value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(PaymentError::MalformedSignature)?;
    if signatures.is_empty() {
        return Err(PaymentError::MalformedSignature);
    }
    if now.abs_diff(timestamp) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(PaymentError::StaleSignature);
    }

    let matches = signatures.iter().any(|signature| {
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(signature).is_ok()
    });

    if matches {
        Ok(())
    } else {
        Err(PaymentError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_123","metadata":{"order_number":"MQ-20250101-ABC123"}}}}"#;

    #[test]
    fn test_valid_signature() {
        let now = 1_700_000_000;
        let header = format!("t={now},v1={}", sign_payload(SECRET, now, PAYLOAD));
        assert!(verify_webhook_signature(&header, PAYLOAD, SECRET, now + 10).is_ok());
    }

    #[test]
    fn test_any_matching_v1_is_accepted() {
        let now = 1_700_000_000;
        let header = format!(
            "t={now},v1={},v1={}",
            "00".repeat(32),
            sign_payload(SECRET, now, PAYLOAD)
        );
        assert!(verify_webhook_signature(&header, PAYLOAD, SECRET, now).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let now = 1_700_000_000;
        let header = format!("t={now},v1={}", sign_payload(SECRET, now, PAYLOAD));
        assert!(matches!(
            verify_webhook_signature(&header, b"{}", SECRET, now),
            Err(PaymentError::InvalidSignature)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let now = 1_700_000_000;
        let header = format!("t={now},v1={}", sign_payload("other", now, PAYLOAD));
        assert!(matches!(
            verify_webhook_signature(&header, PAYLOAD, SECRET, now),
            Err(PaymentError::InvalidSignature)
        ));
    }

    #[test]
    fn test_stale_signature_rejected() {
        let signed_at = 1_700_000_000;
        let header = format!("t={signed_at},v1={}", sign_payload(SECRET, signed_at, PAYLOAD));
        let now = signed_at + SIGNATURE_TOLERANCE_SECS + 1;
        assert!(matches!(
            verify_webhook_signature(&header, PAYLOAD, SECRET, now),
            Err(PaymentError::StaleSignature)
        ));
    }

    #[test]
    fn test_extreme_timestamps_are_stale() {
        for header in ["t=-9223372036854775808,v1=00", "t=9223372036854775807,v1=00"] {
            assert!(
                matches!(
                    verify_webhook_signature(header, PAYLOAD, SECRET, 1_700_000_000),
                    Err(PaymentError::StaleSignature)
                ),
                "header {header:?}"
            );
        }
        assert!(matches!(
            verify_webhook_signature("t=0,v1=00", PAYLOAD, SECRET, i64::MIN),
            Err(PaymentError::StaleSignature)
        ));
    }

    #[test]
    fn test_malformed_headers() {
        for header in ["", "v1=abcd", "t=notanumber,v1=abcd", "t=1700000000"] {
            assert!(
                matches!(
                    verify_webhook_signature(header, PAYLOAD, SECRET, 1_700_000_000),
                    Err(PaymentError::MalformedSignature)
                ),
                "header {header:?}"
            );
        }
    }

    #[test]
    fn test_classify_events() {
        let event = WebhookEvent::parse(PAYLOAD).unwrap();
        assert_eq!(event.data.object.metadata["order_number"], "MQ-20250101-ABC123");
        assert_eq!(
            event.classify(),
            PaymentEvent::Succeeded {
                payment_intent_id: "pi_123".to_string()
            }
        );

        let failed = WebhookEvent::parse(
            br#"{"id":"evt_2","type":"payment_intent.payment_failed","data":{"object":{"id":"pi_9"}}}"#,
        )
        .unwrap();
        assert_eq!(
            failed.classify(),
            PaymentEvent::Failed {
                payment_intent_id: "pi_9".to_string()
            }
        );

        let other = WebhookEvent::parse(
            br#"{"id":"evt_3","type":"charge.refunded","data":{"object":{"id":"ch_1"}}}"#,
        )
        .unwrap();
        assert!(matches!(other.classify(), PaymentEvent::Ignored { .. }));
    }
}
