//! Malmequer storefront library.
//!
//! The public JSON API: catalog, search, carts, checkout, orders, wishlist,
//! reviews, account data and recommendations. The binary in `main.rs` only
//! wires configuration, telemetry and the server around [`routes::app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
