//! ENF shop storefront library.
//!
//! Catalog browsing, the session cart, checkout, and customer accounts.
//! The binary in `main.rs` wires these into an axum server; the CLI and the
//! integration tests use the same services directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

/// Migrations for the shop schema and the session store.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
