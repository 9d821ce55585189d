//! Domain models for the storefront.
//!
//! These are validated domain objects loaded by the repositories in
//! [`crate::db`]; database row types stay private to the repositories.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod session;
pub mod user;

pub use cart::{CartContents, CartItemDetail};
pub use catalog::{Category, Product, ProductDetail, ProductImage, ProductSize, Size};
pub use order::{Order, OrderItem, OrderWithItems, PaymentReference};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
