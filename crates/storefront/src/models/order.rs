//! Order domain types.

use chrono::{DateTime, Utc};

use enf_core::checkout::{ContactDetails, OrderLine};
use enf_core::{OrderId, OrderItemId, OrderStatus, PaymentProvider, Price, PriceError, UserId};

/// A placed order.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Contact and shipping details as entered at checkout.
    pub contact: ContactDetails,
    /// Total computed at checkout; never recomputed.
    pub total_price: Price,
    pub status: OrderStatus,
    pub payment_provider: Option<PaymentProvider>,
    pub stripe_payment_intent_id: Option<String>,
    pub heleket_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One order line with display names.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    /// Product, size, quantity and the unit price captured at checkout.
    pub line: OrderLine,
    pub product_name: String,
    pub product_slug: String,
    pub size_name: String,
}

impl OrderItem {
    /// Captured unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::TooLarge` when the line total does not fit a price.
    pub fn total_price(&self) -> Result<Price, PriceError> {
        self.line.total_price()
    }
}

/// An order together with its lines.
#[derive(Debug, Clone)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// A payment identifier issued by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentReference {
    /// Stripe payment intent id (`pi_...`).
    Stripe(String),
    /// Heleket payment id.
    Heleket(String),
}

impl PaymentReference {
    /// A reference issued by `provider`; `None` if `id` is blank.
    #[must_use]
    pub fn new(provider: PaymentProvider, id: &str) -> Option<Self> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        let id = id.to_owned();
        Some(match provider {
            PaymentProvider::Stripe => Self::Stripe(id),
            PaymentProvider::Heleket => Self::Heleket(id),
        })
    }

    /// The provider that issued this reference.
    #[must_use]
    pub const fn provider(&self) -> PaymentProvider {
        match self {
            Self::Stripe(_) => PaymentProvider::Stripe,
            Self::Heleket(_) => PaymentProvider::Heleket,
        }
    }

    /// The raw identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Stripe(id) | Self::Heleket(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_reference_follows_provider() {
        let stripe = PaymentReference::new(PaymentProvider::Stripe, " pi_3Nq ");
        assert_eq!(stripe, Some(PaymentReference::Stripe("pi_3Nq".to_owned())));

        let heleket = PaymentReference::new(PaymentProvider::Heleket, "hk-1");
        assert_eq!(
            heleket.as_ref().map(PaymentReference::provider),
            Some(PaymentProvider::Heleket)
        );
        assert_eq!(heleket.as_ref().map(PaymentReference::id), Some("hk-1"));
    }

    #[test]
    fn test_blank_payment_reference_is_rejected() {
        assert_eq!(PaymentReference::new(PaymentProvider::Stripe, "   "), None);
    }
}
