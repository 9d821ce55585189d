//! Checkout: turning a cart into an order snapshot.
//!
//! Orders copy everything they need at the moment of checkout. Contact and
//! address details are copied from the submitted form, and each item's unit
//! price is copied from the product's current price. Later edits to the
//! user's profile or to product prices never reach a placed order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{Cart, LineKey};
use crate::text::clean_optional;
use crate::types::{Email, Price, PriceError};

/// Errors from building an order.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// There is nothing to order.
    #[error("cart is empty")]
    EmptyCart,
    /// A line total or the order total does not fit a price.
    #[error("order total must be below {max}")]
    TotalTooLarge {
        /// Exclusive upper bound.
        max: Decimal,
    },
}

impl From<PriceError> for CheckoutError {
    fn from(_: PriceError) -> Self {
        Self::TotalTooLarge {
            max: Price::upper_bound(),
        }
    }
}

/// Optional postal and contact fields shared by user profiles and orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Company name.
    pub company: Option<String>,
    /// First address line.
    pub address1: Option<String>,
    /// Second address line.
    pub address2: Option<String>,
    /// City.
    pub city: Option<String>,
    /// Country.
    pub country: Option<String>,
    /// Province or region.
    pub province: Option<String>,
    /// Postal code.
    pub postal_code: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
}

impl Address {
    /// Strip markup and surrounding whitespace from every field, turning blank
    /// values into `None`.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            company: clean_optional(self.company.as_deref()),
            address1: clean_optional(self.address1.as_deref()),
            address2: clean_optional(self.address2.as_deref()),
            city: clean_optional(self.city.as_deref()),
            country: clean_optional(self.country.as_deref()),
            province: clean_optional(self.province.as_deref()),
            postal_code: clean_optional(self.postal_code.as_deref()),
            phone: clean_optional(self.phone.as_deref()),
        }
    }
}

/// Buyer details copied onto an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    /// Buyer's first name.
    pub first_name: String,
    /// Buyer's last name.
    pub last_name: String,
    /// Where order notices go.
    pub email: Email,
    /// Delivery address and phone.
    pub address: Address,
    /// Free-text delivery notes.
    pub special_instructions: Option<String>,
}

/// One order line: a price snapshot times a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Product and size ordered.
    pub key: LineKey,
    /// Always at least 1.
    pub quantity: u32,
    /// Unit price at the time of ordering.
    pub price: Price,
}

impl OrderLine {
    /// Unit price times quantity, exactly.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::TooLarge` when the line total does not fit a price.
    pub fn total_price(&self) -> Result<Price, PriceError> {
        self.price.line_total(self.quantity)
    }
}

/// An order ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    contact: ContactDetails,
    items: Vec<OrderLine>,
    total_price: Price,
}

impl OrderDraft {
    /// Snapshot a cart into an order.
    ///
    /// Each cart line becomes one order line carrying the line's current unit
    /// price; the order total is computed once here and stored as-is.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` when the cart has no lines and
    /// `CheckoutError::TotalTooLarge` when the total cannot be stored.
    pub fn from_cart(contact: ContactDetails, cart: &Cart) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let items: Vec<OrderLine> = cart
            .lines()
            .iter()
            .map(|line| OrderLine {
                key: line.key,
                quantity: line.quantity,
                price: line.unit_price,
            })
            .collect();
        let total_price = items
            .iter()
            .try_fold(Price::ZERO, |total, line| total.checked_add(line.total_price()?))?;

        let contact = ContactDetails {
            address: contact.address.sanitized(),
            special_instructions: clean_optional(contact.special_instructions.as_deref()),
            ..contact
        };

        Ok(Self {
            contact,
            items,
            total_price,
        })
    }

    /// Buyer details.
    #[must_use]
    pub const fn contact(&self) -> &ContactDetails {
        &self.contact
    }

    /// Order lines in cart order.
    #[must_use]
    pub fn items(&self) -> &[OrderLine] {
        &self.items
    }

    /// Total computed at snapshot time.
    #[must_use]
    pub const fn total_price(&self) -> Price {
        self.total_price
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::cart::CartLine;
    use crate::types::{CartId, CartItemId, ProductId, ProductSizeId};

    fn contact() -> ContactDetails {
        ContactDetails {
            first_name: "Anna".to_owned(),
            last_name: "Ivanova".to_owned(),
            email: Email::parse("anna@example.com").unwrap(),
            address: Address {
                city: Some(" <b>Kazan</b> ".to_owned()),
                phone: Some("   ".to_owned()),
                ..Address::default()
            },
            special_instructions: Some("Leave at the door".to_owned()),
        }
    }

    fn cart_with_price(amount: rust_decimal::Decimal) -> Cart {
        Cart::new(
            CartId::new(7),
            vec![
                CartLine {
                    id: Some(CartItemId::new(1)),
                    key: LineKey::new(ProductId::new(1), ProductSizeId::new(1)),
                    quantity: 3,
                    unit_price: Price::new(amount).unwrap(),
                },
                CartLine {
                    id: Some(CartItemId::new(2)),
                    key: LineKey::new(ProductId::new(2), ProductSizeId::new(4)),
                    quantity: 1,
                    unit_price: Price::new(dec!(250.00)).unwrap(),
                },
            ],
        )
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let err = OrderDraft::from_cart(contact(), &Cart::empty()).unwrap_err();
        assert_eq!(err, CheckoutError::EmptyCart);
    }

    #[test]
    fn test_snapshot_copies_lines_and_total() {
        let draft = OrderDraft::from_cart(contact(), &cart_with_price(dec!(1200.00))).unwrap();
        assert_eq!(draft.items().len(), 2);
        assert_eq!(draft.items()[0].quantity, 3);
        assert_eq!(draft.items()[0].total_price().unwrap().amount(), dec!(3600.00));
        assert_eq!(draft.total_price().amount(), dec!(3850.00));
    }

    #[test]
    fn test_total_beyond_numeric_is_rejected() {
        let mut cart = Cart::empty();
        cart.add_product(
            LineKey::new(ProductId::new(1), ProductSizeId::new(1)),
            Price::new(dec!(5000.00)).unwrap(),
            30_000,
        )
        .unwrap();

        let err = OrderDraft::from_cart(contact(), &cart).unwrap_err();
        assert_eq!(
            err,
            CheckoutError::TotalTooLarge {
                max: dec!(100000000)
            }
        );
    }

    #[test]
    fn test_lines_that_fit_but_sum_past_numeric_are_rejected() {
        let err = OrderDraft::from_cart(contact(), &cart_with_price(dec!(33333300.00)))
            .unwrap_err();
        assert!(matches!(err, CheckoutError::TotalTooLarge { .. }));
    }

    #[test]
    fn test_snapshot_is_independent_of_later_price_changes() {
        let draft = OrderDraft::from_cart(contact(), &cart_with_price(dec!(1200.00))).unwrap();

        // The product gets more expensive after checkout
        let repriced = cart_with_price(dec!(1500.00));

        assert_eq!(repriced.subtotal().unwrap().amount(), dec!(4750.00));
        assert_eq!(draft.items()[0].price.amount(), dec!(1200.00));
        assert_eq!(draft.total_price().amount(), dec!(3850.00));
    }

    #[test]
    fn test_contact_is_sanitized() {
        let draft = OrderDraft::from_cart(contact(), &cart_with_price(dec!(10))).unwrap();
        assert_eq!(draft.contact().address.city.as_deref(), Some("Kazan"));
        assert_eq!(draft.contact().address.phone, None);
        assert_eq!(
            draft.contact().special_instructions.as_deref(),
            Some("Leave at the door")
        );
    }
}
