//! Transactional email.
//!
//! Messages are rendered from Askama templates (HTML + plain text) and handed
//! to an [`EmailSender`]. SMTP delivery goes through lettre; without SMTP
//! configuration messages are only logged.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use thiserror::Error;

use malmequer_core::{CurrencyCode, OrderStatus, Price};

use crate::config::EmailConfig;
use crate::models::OrderWithItems;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered email ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Delivers rendered messages.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;
}

/// Sends mail over SMTP with STARTTLS.
#[derive(Clone)]
pub struct SmtpEmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpEmailSender {
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(message.to.clone()))?)
            .subject(&message.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.html),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(subject = %message.subject, "Email sent");
        Ok(())
    }
}

/// Logs messages instead of sending them. Used when SMTP is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        tracing::info!(subject = %message.subject, "SMTP not configured, email not sent");
        Ok(())
    }
}

// =============================================================================
// Templates
// =============================================================================

/// An order line formatted for display.
pub struct EmailLine {
    pub name: String,
    pub variant: Option<String>,
    pub quantity: i32,
    pub line_total: String,
}

/// Order figures formatted for display.
pub struct EmailOrder {
    pub order_number: String,
    pub full_name: String,
    pub status: &'static str,
    pub lines: Vec<EmailLine>,
    pub subtotal: String,
    pub discount: Option<String>,
    pub tax: String,
    pub shipping: String,
    pub total: String,
    pub order_url: String,
}

impl EmailOrder {
    #[must_use]
    pub fn new(order: &OrderWithItems, currency: CurrencyCode, base_url: &str) -> Self {
        let money = |amount: Decimal| Price::new(amount, currency).display();
        let o = &order.order;
        Self {
            order_number: o.order_number.clone(),
            full_name: o.shipping_address.full_name.clone(),
            status: o.status.label(),
            lines: order
                .items
                .iter()
                .map(|item| {
                    let variant = [item.size_label.as_deref(), item.color_name.as_deref()]
                        .into_iter()
                        .flatten()
                        .collect::<Vec<_>>()
                        .join(" / ");
                    EmailLine {
                        name: item.product_name.clone(),
                        variant: (!variant.is_empty()).then_some(variant),
                        quantity: item.quantity,
                        line_total: money(item.line_total),
                    }
                })
                .collect(),
            subtotal: money(o.subtotal),
            discount: (o.discount > Decimal::ZERO).then(|| money(o.discount)),
            tax: money(o.tax),
            shipping: money(o.shipping),
            total: money(o.total),
            order_url: format!("{}/orders/{}", base_url.trim_end_matches('/'), o.order_number),
        }
    }
}

#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeHtml<'a> {
    name: &'a str,
    shop_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeText<'a> {
    name: &'a str,
    shop_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    order: &'a EmailOrder,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    order: &'a EmailOrder,
}

#[derive(Template)]
#[template(path = "email/order_status.html")]
struct OrderStatusHtml<'a> {
    order: &'a EmailOrder,
}

#[derive(Template)]
#[template(path = "email/order_status.txt")]
struct OrderStatusText<'a> {
    order: &'a EmailOrder,
}

#[derive(Template)]
#[template(path = "email/order_cancelled.html")]
struct OrderCancelledHtml<'a> {
    order: &'a EmailOrder,
    refunded: bool,
}

#[derive(Template)]
#[template(path = "email/order_cancelled.txt")]
struct OrderCancelledText<'a> {
    order: &'a EmailOrder,
    refunded: bool,
}

/// # Errors
///
/// Returns `EmailError::Template` if rendering fails.
pub fn welcome_email(to: &str, name: &str, shop_url: &str) -> Result<EmailMessage, EmailError> {
    Ok(EmailMessage {
        to: to.to_string(),
        subject: "Welcome to Malmequer".to_string(),
        text: WelcomeText { name, shop_url }.render()?,
        html: WelcomeHtml { name, shop_url }.render()?,
    })
}

/// # Errors
///
/// Returns `EmailError::Template` if rendering fails.
pub fn order_confirmation_email(to: &str, order: &EmailOrder) -> Result<EmailMessage, EmailError> {
    Ok(EmailMessage {
        to: to.to_string(),
        subject: format!("Order {} confirmed", order.order_number),
        text: OrderConfirmationText { order }.render()?,
        html: OrderConfirmationHtml { order }.render()?,
    })
}

/// Status update, or the cancellation message when the order was cancelled.
///
/// # Errors
///
/// Returns `EmailError::Template` if rendering fails.
pub fn order_status_email(
    to: &str,
    order: &EmailOrder,
    status: OrderStatus,
    refunded: bool,
) -> Result<EmailMessage, EmailError> {
    if status == OrderStatus::Cancelled {
        return Ok(EmailMessage {
            to: to.to_string(),
            subject: format!("Order {} cancelled", order.order_number),
            text: OrderCancelledText { order, refunded }.render()?,
            html: OrderCancelledHtml { order, refunded }.render()?,
        });
    }
    Ok(EmailMessage {
        to: to.to_string(),
        subject: format!("Order {} is now {}", order.order_number, order.status.to_lowercase()),
        text: OrderStatusText { order }.render()?,
        html: OrderStatusHtml { order }.render()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> EmailOrder {
        EmailOrder {
            order_number: "MQ-20250301-K3Z9QX".to_string(),
            full_name: "Ana Sousa".to_string(),
            status: "Shipped",
            lines: vec![EmailLine {
                name: "Linen Shirt".to_string(),
                variant: Some("M / Sand".to_string()),
                quantity: 2,
                line_total: "€59.80".to_string(),
            }],
            subtotal: "€59.80".to_string(),
            discount: None,
            tax: "€13.75".to_string(),
            shipping: "€0.00".to_string(),
            total: "€73.55".to_string(),
            order_url: "https://shop.example/orders/MQ-20250301-K3Z9QX".to_string(),
        }
    }

    #[test]
    fn test_welcome_email_renders() {
        let message = welcome_email("ana@example.pt", "Ana", "https://shop.example").unwrap();
        assert_eq!(message.subject, "Welcome to Malmequer");
        assert!(message.text.contains("Ana"));
        assert!(message.text.contains("https://shop.example"));
        assert!(message.html.contains("Welcome, Ana"));
    }

    #[test]
    fn test_confirmation_lists_lines_and_total() {
        let order = sample_order();
        let message = order_confirmation_email("ana@example.pt", &order).unwrap();
        assert!(message.subject.contains("MQ-20250301-K3Z9QX"));
        assert!(message.text.contains("Linen Shirt"));
        assert!(message.text.contains("M / Sand"));
        assert!(message.html.contains("€73.55"));
    }

    #[test]
    fn test_status_email_variants() {
        let order = sample_order();
        let shipped =
            order_status_email("ana@example.pt", &order, OrderStatus::Shipped, false).unwrap();
        assert!(shipped.subject.ends_with("is now shipped"));

        let cancelled =
            order_status_email("ana@example.pt", &order, OrderStatus::Cancelled, true).unwrap();
        assert!(cancelled.subject.ends_with("cancelled"));
        assert!(cancelled.text.contains("refund"));
    }
}
