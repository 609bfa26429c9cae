//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - customer registration and login
//! - `cart` - cart pricing, stock checks and guest cart merging
//! - `checkout` - order placement
//! - `email` - templates and delivery
//! - `notifications` - preference-gated customer email
//! - `orders` - order lookup, cancellation and payment events
//! - `payments` - payment processor client and webhook signatures
//! - `recommendations` - popular, trending and bought-together ranking

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod email;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod recommendations;
