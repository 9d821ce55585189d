//! Order management commands.

use enf_core::{OrderId, OrderStatus, PaymentProvider};
use enf_storefront::models::PaymentReference;
use enf_storefront::services::PaymentService;

use super::{CommandError, connect};

/// Move an order to `status`.
///
/// # Errors
///
/// Returns an error if the order does not exist or the move is not allowed
/// (for example cancelling a shipped order).
pub async fn set_status(order_id: OrderId, status: OrderStatus) -> Result<(), CommandError> {
    let pool = connect().await?;

    let order = PaymentService::new(&pool)
        .apply_status(order_id, status)
        .await?;

    tracing::info!(
        "Order {} is now {} (total {})",
        order.id,
        order.status.label(),
        order.total_price
    );
    Ok(())
}

/// Record the payment id `provider` issued for an order.
///
/// # Errors
///
/// Returns an error if the reference is blank or the order does not exist.
pub async fn attach_payment(
    order_id: OrderId,
    provider: PaymentProvider,
    reference: &str,
) -> Result<(), CommandError> {
    let reference = PaymentReference::new(provider, reference).ok_or_else(|| {
        CommandError::InvalidArgument("payment reference cannot be blank".to_owned())
    })?;
    let pool = connect().await?;

    let order = PaymentService::new(&pool)
        .attach_reference(order_id, &reference)
        .await?;

    tracing::info!(
        "Order {} now carries {} payment {}",
        order.id,
        provider.label(),
        reference.id()
    );
    Ok(())
}
