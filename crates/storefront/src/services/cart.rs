//! Cart service.
//!
//! Each mutation runs in its own transaction: the cart row is locked, the
//! [`Cart`](enf_core::cart::Cart) aggregate decides the change, and the
//! change is written back before commit.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use enf_core::cart::{CartError, CartLine, LineKey};
use enf_core::{CartItemId, Price, PriceError, ProductId, ProductSizeId};

use crate::db::{CartRepository, CatalogRepository, RepositoryError};
use crate::models::CartContents;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartServiceError {
    /// The aggregate rejected the change.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The product does not exist in the requested size.
    #[error("product is not available in that size")]
    UnknownVariant,

    /// The cart total does not fit a price.
    #[error("cart total is too large: {0}")]
    Total(#[from] PriceError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CartServiceError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Operations over the cart behind a session's cart key.
pub struct CartService<'a> {
    pool: &'a PgPool,
    carts: CartRepository<'a>,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            carts: CartRepository::new(pool),
        }
    }

    /// Current lines with display data; empty if the session has no cart yet.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if loading fails.
    pub async fn contents(&self, cart_key: &str) -> Result<CartContents, CartServiceError> {
        match self.carts.find(cart_key).await? {
            Some(cart_id) => Ok(self.carts.contents(cart_id).await?),
            None => Ok(CartContents::default()),
        }
    }

    /// Add a product in a size, merging into an existing line.
    ///
    /// Returns the resulting line at the product's current price.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::UnknownVariant` if the size does not belong
    /// to the product, `CartServiceError::Cart` for an invalid quantity.
    #[instrument(skip(self))]
    pub async fn add_product(
        &self,
        cart_key: &str,
        product_id: ProductId,
        product_size_id: ProductSizeId,
        quantity: u32,
    ) -> Result<CartLine, CartServiceError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity.into());
        }

        let cart_id = self.carts.get_or_create(cart_key).await?;
        let mut tx = self.pool.begin().await?;

        let unit_price = CatalogRepository::variant_price(&mut tx, product_id, product_size_id)
            .await?
            .ok_or(CartServiceError::UnknownVariant)?;

        let mut cart = CartRepository::lock(&mut tx, cart_id).await?;
        let key = LineKey::new(product_id, product_size_id);
        let (line, change) = cart.add_product(key, unit_price, quantity)?;
        let mut line = line.clone();

        if let Some(item_id) = CartRepository::persist(&mut tx, cart_id, change).await? {
            line.id = Some(item_id);
        }

        tx.commit().await?;
        tracing::debug!(%cart_id, quantity = line.quantity, "cart line updated");
        Ok(line)
    }

    /// Remove a line. Returns `false` if the cart has no such line.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if the database operation fails.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        cart_key: &str,
        item_id: CartItemId,
    ) -> Result<bool, CartServiceError> {
        let Some(cart_id) = self.carts.find(cart_key).await? else {
            return Ok(false);
        };

        let mut tx = self.pool.begin().await?;
        let mut cart = CartRepository::lock(&mut tx, cart_id).await?;

        let Some(change) = cart.remove_item(item_id) else {
            return Ok(false);
        };

        CartRepository::persist(&mut tx, cart_id, change).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Set a line's quantity; zero or less removes the line.
    ///
    /// Returns `false` if the cart has no such line.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if the database operation fails.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        cart_key: &str,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<bool, CartServiceError> {
        let Some(cart_id) = self.carts.find(cart_key).await? else {
            return Ok(false);
        };

        let mut tx = self.pool.begin().await?;
        let mut cart = CartRepository::lock(&mut tx, cart_id).await?;

        let Some(change) = cart.update_item_quantity(item_id, quantity) else {
            return Ok(false);
        };

        CartRepository::persist(&mut tx, cart_id, change).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Delete every line in the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if the database operation fails.
    #[instrument(skip(self))]
    pub async fn clear(&self, cart_key: &str) -> Result<(), CartServiceError> {
        let Some(cart_id) = self.carts.find(cart_key).await? else {
            return Ok(());
        };

        let mut tx = self.pool.begin().await?;
        let mut cart = CartRepository::lock(&mut tx, cart_id).await?;
        let change = cart.clear();
        CartRepository::persist(&mut tx, cart_id, change).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Sum of line quantities.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if loading fails.
    pub async fn total_items(&self, cart_key: &str) -> Result<u64, CartServiceError> {
        Ok(self.contents(cart_key).await?.total_items())
    }

    /// Sum of line totals at current product prices.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if loading fails and
    /// `CartServiceError::Total` if the total does not fit a price.
    pub async fn subtotal(&self, cart_key: &str) -> Result<Price, CartServiceError> {
        Ok(self.contents(cart_key).await?.subtotal()?)
    }
}
