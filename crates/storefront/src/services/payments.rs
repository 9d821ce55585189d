//! Payment bookkeeping on orders.
//!
//! Provider protocols live elsewhere; this records the identifier a provider
//! issued and moves the order through its lifecycle when the provider reports
//! an outcome.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use enf_core::{OrderId, OrderStatus};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::{Order, PaymentReference};

/// Errors from payment operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Order not found.
    #[error("order not found")]
    OrderNotFound,

    /// The order cannot move to the requested status.
    #[error("{0}")]
    InvalidTransition(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for PaymentError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::OrderNotFound,
            RepositoryError::Conflict(message) => Self::InvalidTransition(message),
            other => Self::Repository(other),
        }
    }
}

/// Payment service.
pub struct PaymentService<'a> {
    orders: OrderRepository<'a>,
}

impl<'a> PaymentService<'a> {
    /// Create a new payment service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool),
        }
    }

    /// Record which provider is handling an order and its payment id.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::OrderNotFound` if the order does not exist.
    #[instrument(skip(self))]
    pub async fn attach_reference(
        &self,
        order_id: OrderId,
        reference: &PaymentReference,
    ) -> Result<Order, PaymentError> {
        Ok(self.orders.attach_payment(order_id, reference).await?)
    }

    /// Mark an order paid.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidTransition` unless the order is pending.
    pub async fn confirm_payment(&self, order_id: OrderId) -> Result<Order, PaymentError> {
        self.apply_status(order_id, OrderStatus::Processing).await
    }

    /// Cancel an order that has not shipped.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidTransition` if the order already shipped.
    pub async fn cancel(&self, order_id: OrderId) -> Result<Order, PaymentError> {
        self.apply_status(order_id, OrderStatus::Cancelled).await
    }

    /// Move an order to `status`.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::OrderNotFound` if the order does not exist and
    /// `PaymentError::InvalidTransition` if the lifecycle forbids the move.
    #[instrument(skip(self))]
    pub async fn apply_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, PaymentError> {
        let order = self.orders.transition_status(order_id, status).await?;
        tracing::info!(%order_id, %status, "order status changed");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_map_to_payment_errors() {
        assert!(matches!(
            PaymentError::from(RepositoryError::NotFound),
            PaymentError::OrderNotFound
        ));
        assert!(matches!(
            PaymentError::from(RepositoryError::Conflict("no".to_owned())),
            PaymentError::InvalidTransition(m) if m == "no"
        ));
        assert!(matches!(
            PaymentError::from(RepositoryError::DataCorruption("x".to_owned())),
            PaymentError::Repository(_)
        ));
    }
}
