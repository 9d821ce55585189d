//! ENF Core - Shared domain library.
//!
//! This crate provides the domain types and the small amount of business
//! logic shared by the shop components:
//! - `storefront` - Public-facing shop (catalog, cart, checkout, accounts)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Storage layers load rows, hand them to the types here, and
//! persist whatever change the types report back.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`text`] - Slug generation and markup stripping
//! - [`cart`] - The cart aggregate (merge-add, quantity updates, totals)
//! - [`checkout`] - Order snapshots taken from a cart at checkout time

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod text;
pub mod types;

pub use types::*;
