//! Malmequer Core - Shared types library.
//!
//! This crate provides common types used across all Malmequer components:
//! - `storefront` - Public-facing JSON API (catalog, cart, checkout, orders)
//! - `admin` - Back-office JSON API (products, orders, reports)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure business rules - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, and statuses
//! - [`pricing`] - Variant price extras, line totals, and order totals
//! - [`notifications`] - Customer notification preferences and gating

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod notifications;
pub mod pricing;
pub mod types;

pub use types::*;
