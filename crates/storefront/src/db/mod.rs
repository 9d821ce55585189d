//! Database operations for the shop `PostgreSQL` database.
//!
//! ## Tables (schema `shop`)
//!
//! - `user` - Shop accounts (email login, profile and address)
//! - `category`, `size`, `product`, `product_size`, `product_image` - Catalog
//! - `cart`, `cart_item` - Session carts
//! - `order`, `order_item` - Placed orders with price snapshots
//!
//! Sessions live in `tower_sessions.session`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p enf-cli -- migrate
//! ```

pub mod carts;
pub mod catalog;
pub mod orders;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartRepository;
pub use catalog::CatalogRepository;
pub use orders::OrderRepository;
pub use users::UserRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Query or connection failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value violates a domain invariant.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The requested row does not exist.
    #[error("not found")]
    NotFound,

    /// A uniqueness or state constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Map a unique violation to `RepositoryError::Conflict`, anything else to
/// `RepositoryError::Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Convert a stored `INTEGER` quantity or stock value to `u32`.
pub(crate) fn stored_count(value: i32, what: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {what} in database: {value}")))
}

/// Convert a `u32` count for binding to an `INTEGER` column.
pub(crate) fn to_column(value: u32, what: &str) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::Conflict(format!("{what} too large: {value}")))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_count() {
        assert_eq!(stored_count(3, "quantity").ok(), Some(3));
        assert!(matches!(
            stored_count(-1, "stock"),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_to_column() {
        assert_eq!(to_column(7, "quantity").ok(), Some(7));
        assert!(matches!(
            to_column(u32::MAX, "quantity"),
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[test]
    fn test_non_database_errors_are_not_conflicts() {
        let err = conflict_on_unique(sqlx::Error::RowNotFound, "email already exists");
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
