//! Business logic services for storefront.
//!
//! # Services
//!
//! - `accounts` - User creation, registration, password login, profiles
//! - `cart` - Session cart operations
//! - `checkout` - Placing orders from a cart
//! - `payments` - Provider references and order status changes

pub mod accounts;
pub mod cart;
pub mod checkout;
pub mod payments;

pub use accounts::{AccountError, AccountService};
pub use cart::{CartService, CartServiceError};
pub use checkout::{CheckoutService, CheckoutServiceError};
pub use payments::{PaymentError, PaymentService};
