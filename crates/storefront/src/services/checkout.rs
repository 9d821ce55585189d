//! Checkout: turn a session cart into an order.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use enf_core::checkout::{CheckoutError, OrderDraft};
use enf_core::{OrderId, UserId};

use crate::db::{CartRepository, OrderRepository, RepositoryError};
use crate::forms::{FieldErrors, OrderForm};

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum CheckoutServiceError {
    /// The form has invalid fields; nothing was written.
    #[error("invalid order details")]
    Invalid(FieldErrors),

    /// The cart has no lines.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutServiceError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    carts: CartRepository<'a>,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            carts: CartRepository::new(pool),
        }
    }

    /// Place an order for `user_id` from the session cart.
    ///
    /// The order, its lines, and the emptied cart are committed together.
    /// Line prices are the products' prices at this moment.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutServiceError::Invalid` with field errors for bad input
    /// and `CheckoutServiceError::Checkout` if the cart is empty.
    #[instrument(skip(self, form))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        cart_key: &str,
        form: &OrderForm,
    ) -> Result<OrderId, CheckoutServiceError> {
        let contact = form.validate().map_err(CheckoutServiceError::Invalid)?;

        let cart_id = self
            .carts
            .find(cart_key)
            .await?
            .ok_or(CheckoutError::EmptyCart)?;

        let mut tx = self.pool.begin().await?;
        let mut cart = CartRepository::lock(&mut tx, cart_id).await?;
        let draft = OrderDraft::from_cart(contact, &cart)?;

        let order_id = OrderRepository::insert(&mut tx, user_id, &draft).await?;
        CartRepository::persist(&mut tx, cart_id, cart.clear()).await?;

        tx.commit().await?;
        tracing::info!(%order_id, total = %draft.total_price(), "order placed");
        Ok(order_id)
    }
}
