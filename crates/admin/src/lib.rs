//! Malmequer back-office library.
//!
//! Catalog and stock editing, order handling, reports and the activity log
//! for shop staff. Order, catalog and email plumbing shared with customers
//! comes from `malmequer_storefront`.
//!
//! # Security
//!
//! Every `/api` route except login requires an admin session. The `viewer`
//! role is read-only; creating admin accounts needs `super_admin`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
